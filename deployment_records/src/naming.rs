use crate::error::RecordError;

/// Derives a record file stem from a contract name, e.g. `MirrorToken` -> `mirror-token`.
///
/// Names that are already kebab-case come back unchanged.
pub fn record_stem_for(contract_name: &str) -> String {
    let chars: Vec<char> = contract_name.trim().chars().collect();
    let mut stem = String::with_capacity(chars.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c == '_' || c == ' ' || c == '-' {
            if !stem.is_empty() && !stem.ends_with('-') {
                stem.push('-');
            }
            continue;
        }

        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            let boundary = prev.is_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_uppercase() && next_is_lower);
            if boundary && !stem.ends_with('-') {
                stem.push('-');
            }
        }

        stem.extend(c.to_lowercase());
    }

    stem.trim_end_matches('-').to_owned()
}

/// `<stem>-<network>.json`
pub fn record_file_name(stem: &str, network: &str) -> Result<String, RecordError> {
    validate_name(stem)?;
    validate_name(network)?;
    Ok(format!("{stem}-{network}.json"))
}

/// Record stems and network names end up in a file name, so no separators or `..`.
pub fn validate_name(segment: &str) -> Result<(), RecordError> {
    let trimmed = segment.trim();
    if trimmed.is_empty()
        || trimmed != segment
        || segment.contains(['/', '\\'])
        || segment.contains("..")
        || segment.starts_with('.')
    {
        return Err(RecordError::InvalidName(segment.to_owned()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stem_from_contract_names() {
        assert_eq!(record_stem_for("MirrorToken"), "mirror-token");
        assert_eq!(record_stem_for("CHXToken"), "chx-token");
        assert_eq!(record_stem_for("ERC721Drop"), "erc721-drop");
        assert_eq!(record_stem_for("akashic_mainnet_suite"), "akashic-mainnet-suite");
        assert_eq!(record_stem_for("mirror-token"), "mirror-token");
        assert_eq!(record_stem_for("example"), "example");
    }

    #[test]
    fn test_file_name() {
        assert_eq!(
            record_file_name("example", "polygon").unwrap(),
            "example-polygon.json"
        );
    }

    #[test]
    fn test_file_name_rejects_paths() {
        for bad in ["", " ", "../x", "a/b", "a\\b", ".hidden"] {
            assert!(
                matches!(
                    record_file_name(bad, "polygon"),
                    Err(RecordError::InvalidName(_))
                ),
                "{bad:?} should be rejected"
            );
        }
        assert!(record_file_name("example", "").is_err());
    }
}
