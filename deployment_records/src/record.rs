use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::RecordError;

/// Top level keys owned by the record itself. Free-form fields may not use them.
pub const RESERVED_KEYS: [&str; 4] = ["network", "contractAddress", "deployer", "timestamp"];

/// Facts about one confirmed contract deployment, as persisted to
/// `deployments/<contract>-<network>.json`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRecord {
    pub network: String,
    pub contract_address: String,
    pub deployer: String,
    pub timestamp: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl DeploymentRecord {
    pub fn new(
        network: &str,
        contract_address: &str,
        deployer: &str,
        fields: Map<String, Value>,
    ) -> Result<Self, RecordError> {
        Self::new_at(network, contract_address, deployer, fields, Utc::now())
    }

    pub fn new_at(
        network: &str,
        contract_address: &str,
        deployer: &str,
        fields: Map<String, Value>,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, RecordError> {
        if network.trim().is_empty() {
            return Err(RecordError::EmptyField("network"));
        }
        if contract_address.trim().is_empty() {
            return Err(RecordError::EmptyField("contractAddress"));
        }
        if let Some(key) = fields.keys().find(|k| RESERVED_KEYS.contains(&k.as_str())) {
            return Err(RecordError::ReservedField(key.clone()));
        }

        Ok(Self {
            network: network.to_owned(),
            contract_address: contract_address.to_owned(),
            deployer: deployer.to_owned(),
            // same shape as JS `toISOString()`: 2024-01-01T00:00:00.000Z
            timestamp: timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            fields,
        })
    }

    /// Pretty JSON (two space indent) with a trailing newline.
    pub fn to_json_pretty(&self) -> Result<Vec<u8>, RecordError> {
        let mut bytes = serde_json::to_vec_pretty(self)?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    fn fields(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_serializes_flat() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let record = DeploymentRecord::new_at(
            "polygon",
            "0xABC",
            "0xDEF",
            fields(json!({ "maxSupply": "999", "feeConfiguration": { "zakatBps": "250" } })),
            at,
        )
        .unwrap();

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            json!({
                "network": "polygon",
                "contractAddress": "0xABC",
                "deployer": "0xDEF",
                "timestamp": "2024-03-01T12:00:00.000Z",
                "maxSupply": "999",
                "feeConfiguration": { "zakatBps": "250" }
            })
        );

        let back: DeploymentRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_rejects_empty_network_and_address() {
        assert!(matches!(
            DeploymentRecord::new("", "0xABC", "0xDEF", Map::new()),
            Err(RecordError::EmptyField("network"))
        ));
        assert!(matches!(
            DeploymentRecord::new("polygon", "  ", "0xDEF", Map::new()),
            Err(RecordError::EmptyField("contractAddress"))
        ));
    }

    #[test]
    fn test_rejects_reserved_field() {
        let res = DeploymentRecord::new(
            "polygon",
            "0xABC",
            "0xDEF",
            fields(json!({ "timestamp": "yesterday" })),
        );
        assert!(matches!(res, Err(RecordError::ReservedField(k)) if k == "timestamp"));
    }

    #[test]
    fn test_pretty_json_ends_with_newline() {
        let record = DeploymentRecord::new("polygon", "0xABC", "0xDEF", Map::new()).unwrap();
        let bytes = record.to_json_pretty().unwrap();
        assert_eq!(bytes.last(), Some(&b'\n'));
        assert!(String::from_utf8(bytes).unwrap().contains("\n  \"network\": \"polygon\""));
    }
}
