use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};
use ethers::{abi::Abi, types::Bytes};
use serde_json::Value;
use tracing::debug;

/// Compiled contract: ABI plus creation bytecode.
#[derive(Clone, Debug)]
pub struct ContractArtifact {
    pub contract_name: String,
    pub abi: Abi,
    pub bytecode: Bytes,
    pub source: PathBuf,
    /// solidity source the contract was compiled from, e.g. `contracts/TruthCoin.sol`
    pub source_name: Option<String>,
}

impl ContractArtifact {
    /// Finds `<name>.json` anywhere below `artifacts_dir`. Covers both the hardhat
    /// (`artifacts/contracts/**/<Name>.sol/<Name>.json`) and foundry
    /// (`out/<Name>.sol/<Name>.json`) layouts.
    pub fn load(artifacts_dir: &Path, contract_name: &str) -> Result<Self> {
        let file_name = format!("{contract_name}.json");
        let path = find_file(artifacts_dir, &file_name)?.ok_or_else(|| {
            anyhow!(
                "no artifact for contract {contract_name} under {}",
                artifacts_dir.display()
            )
        })?;
        debug!(contract = contract_name, path = %path.display(), "loading artifact");

        let contents =
            fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
        let json: Value = serde_json::from_slice(&contents)
            .with_context(|| format!("invalid artifact json in {}", path.display()))?;

        Self::from_json(contract_name, &json, path)
    }

    fn from_json(contract_name: &str, json: &Value, source: PathBuf) -> Result<Self> {
        let abi_json = json
            .get("abi")
            .ok_or_else(|| anyhow!("artifact {} has no abi", source.display()))?;
        let abi: Abi = serde_json::from_value(abi_json.clone())
            .with_context(|| format!("invalid abi in {}", source.display()))?;

        // hardhat: "bytecode": "0x..", foundry: "bytecode": { "object": "0x.." }
        let bytecode_hex = match json.get("bytecode") {
            Some(Value::String(s)) => s.as_str(),
            Some(Value::Object(obj)) => obj.get("object").and_then(Value::as_str).unwrap_or(""),
            _ => "",
        };
        let bytecode_hex = bytecode_hex.trim_start_matches("0x");
        if bytecode_hex.is_empty() {
            return Err(anyhow!(
                "{contract_name} has no deployable bytecode (abstract contract or interface?)"
            ));
        }
        let bytecode = hex::decode(bytecode_hex)
            .with_context(|| format!("invalid bytecode hex in {}", source.display()))?;

        // hardhat: "sourceName", foundry: the metadata compilation target
        let source_name = json
            .get("sourceName")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .or_else(|| {
                json.pointer("/metadata/settings/compilationTarget")
                    .and_then(Value::as_object)
                    .and_then(|target| target.keys().next().cloned())
            });

        Ok(Self {
            contract_name: contract_name.to_owned(),
            abi,
            bytecode: bytecode.into(),
            source,
            source_name,
        })
    }
}

fn find_file(dir: &Path, file_name: &str) -> Result<Option<PathBuf>> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))?;

    let mut subdirs = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_dir() {
            // build-info holds compiler io, not artifacts
            if path.file_name().is_some_and(|n| n == "build-info") {
                continue;
            }
            subdirs.push(path);
        } else if path.file_name().is_some_and(|n| n == file_name) {
            return Ok(Some(path));
        }
    }

    subdirs.sort();
    for subdir in subdirs {
        if let Some(found) = find_file(&subdir, file_name)? {
            return Ok(Some(found));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    fn abi() -> Value {
        json!([
            {
                "type": "constructor",
                "stateMutability": "nonpayable",
                "inputs": [
                    { "name": "communityTreasury", "type": "address", "internalType": "address" },
                    { "name": "maxSupply", "type": "uint256", "internalType": "uint256" }
                ]
            },
            {
                "type": "function",
                "name": "totalSupply",
                "stateMutability": "view",
                "inputs": [],
                "outputs": [{ "name": "", "type": "uint256", "internalType": "uint256" }]
            }
        ])
    }

    fn write_json(path: &Path, value: &Value) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, serde_json::to_vec(value).unwrap()).unwrap();
    }

    #[test]
    fn test_load_hardhat_layout() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("artifacts");
        write_json(
            &dir.join("build-info/abc.json"),
            &json!({ "TruthCoin.json": "decoy" }),
        );
        write_json(
            &dir.join("contracts/tokens/TruthCoin.sol/TruthCoin.json"),
            &json!({
                "contractName": "TruthCoin",
                "sourceName": "contracts/tokens/TruthCoin.sol",
                "abi": abi(),
                "bytecode": "0x6080604052"
            }),
        );

        let artifact = ContractArtifact::load(&dir, "TruthCoin").unwrap();

        assert_eq!(artifact.contract_name, "TruthCoin");
        assert_eq!(artifact.bytecode.to_vec(), vec![0x60, 0x80, 0x60, 0x40, 0x52]);
        assert_eq!(artifact.abi.constructor().unwrap().inputs.len(), 2);
        assert!(artifact.abi.function("totalSupply").is_ok());
        assert_eq!(artifact.source_name.as_deref(), Some("contracts/tokens/TruthCoin.sol"));
    }

    #[test]
    fn test_load_foundry_layout() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("out");
        write_json(
            &dir.join("TruthCoin.sol/TruthCoin.json"),
            &json!({
                "abi": abi(),
                "bytecode": { "object": "0x6080", "linkReferences": {} },
                "metadata": { "settings": { "compilationTarget": { "src/TruthCoin.sol": "TruthCoin" } } }
            }),
        );

        let artifact = ContractArtifact::load(&dir, "TruthCoin").unwrap();
        assert_eq!(artifact.bytecode.to_vec(), vec![0x60, 0x80]);
        assert_eq!(artifact.source_name.as_deref(), Some("src/TruthCoin.sol"));
    }

    #[test]
    fn test_interface_is_not_deployable() {
        let tmp = TempDir::new().unwrap();
        write_json(
            &tmp.path().join("IToken.sol/IToken.json"),
            &json!({ "abi": [], "bytecode": "0x" }),
        );

        let err = ContractArtifact::load(tmp.path(), "IToken").unwrap_err();
        assert!(err.to_string().contains("no deployable bytecode"));
    }

    #[test]
    fn test_missing_artifact() {
        let tmp = TempDir::new().unwrap();
        assert!(ContractArtifact::load(tmp.path(), "Nope").is_err());
    }
}
