use std::{collections::HashSet, fs, path::Path};

use anyhow::{anyhow, Context, Result};
use deployment_records::{
    naming::{record_stem_for, validate_name},
    RESERVED_KEYS,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::args::ArgSource;

/// Record keys filled in by the deploy procedure itself.
pub const GENERATED_KEYS: [&str; 8] = [
    "contractName",
    "chainId",
    "transactionHash",
    "blockNumber",
    "gasUsed",
    "constructorArguments",
    "encodedConstructorArgs",
    "onchain",
];

/// Ordered list of contracts to deploy in one run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeploymentPlan {
    pub contracts: Vec<ContractPlan>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContractPlan {
    /// artifact name, e.g. `TruthCoin`
    pub name: String,
    /// record file stem, defaults to the kebab-case name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record: Option<String>,
    #[serde(default)]
    pub verify: bool,
    #[serde(default)]
    pub args: Vec<ArgSource>,
    /// zero argument view functions read after deployment
    #[serde(default)]
    pub readbacks: Vec<String>,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl ContractPlan {
    pub fn record_stem(&self) -> String {
        self.record
            .clone()
            .unwrap_or_else(|| record_stem_for(&self.name))
    }
}

impl DeploymentPlan {
    /// `.json` plans are read as JSON, anything else as TOML.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read plan {}", path.display()))?;

        let plan = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&contents),
            _ => Self::from_toml_str(&contents),
        }
        .with_context(|| format!("invalid plan {}", path.display()))?;

        Ok(plan)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let plan: Self = toml::from_str(contents)?;
        plan.validate()?;
        Ok(plan)
    }

    pub fn from_json_str(contents: &str) -> Result<Self> {
        let plan: Self = serde_json::from_str(contents)?;
        plan.validate()?;
        Ok(plan)
    }

    pub fn validate(&self) -> Result<()> {
        if self.contracts.is_empty() {
            return Err(anyhow!("plan has no contracts"));
        }

        let mut names = HashSet::new();
        let mut stems = HashSet::new();
        for contract in &self.contracts {
            if contract.name.trim().is_empty() {
                return Err(anyhow!("contract name must not be empty"));
            }
            if !names.insert(contract.name.as_str()) {
                return Err(anyhow!("contract {} is listed twice", contract.name));
            }

            let stem = contract.record_stem();
            validate_name(&stem)?;
            if !stems.insert(stem.clone()) {
                return Err(anyhow!("record name {stem} is used by more than one contract"));
            }

            if let Some(key) = contract.fields.keys().find(|k| {
                RESERVED_KEYS.contains(&k.as_str()) || GENERATED_KEYS.contains(&k.as_str())
            }) {
                return Err(anyhow!(
                    "field `{key}` of {} clashes with a generated record field",
                    contract.name
                ));
            }
        }
        Ok(())
    }

    /// Contracts to run, in plan order. An empty `only` selects everything.
    pub fn select(&self, only: &[String]) -> Result<Vec<&ContractPlan>> {
        if let Some(unknown) = only
            .iter()
            .find(|name| !self.contracts.iter().any(|c| &c.name == *name))
        {
            return Err(anyhow!("{unknown} is not part of the plan"));
        }

        Ok(self
            .contracts
            .iter()
            .filter(|c| only.is_empty() || only.contains(&c.name))
            .collect())
    }

    /// Record stem of the contract named `contract`, by contract or record name.
    pub fn record_stem_of(&self, contract: &str) -> Option<String> {
        self.contracts
            .iter()
            .find(|c| c.name == contract || c.record_stem() == contract)
            .map(ContractPlan::record_stem)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const SUITE: &str = r#"
[[contracts]]
name = "AkashicRecordsLabel"
verify = true
args = [{ env = "AKASHIC_BASE_URI", default = "ipfs://akashic/" }, "$deployer"]
readbacks = ["name", "symbol"]

[contracts.fields]
baseURI = "ipfs://akashic/"
royaltyBps = 1000

[[contracts]]
name = "AkashicTreasuryVault"
record = "akashic-vault"
args = [{ contract = "AkashicRecordsLabel" }, { env = "ZAKAT_RECIPIENT" }]
"#;

    #[test]
    fn test_parse_toml_plan() {
        let plan = DeploymentPlan::from_toml_str(SUITE).unwrap();

        assert_eq!(plan.contracts.len(), 2);
        let label = &plan.contracts[0];
        assert!(label.verify);
        assert_eq!(label.record_stem(), "akashic-records-label");
        assert_eq!(label.readbacks, ["name", "symbol"]);
        assert_eq!(label.fields["royaltyBps"], json!(1000));
        assert_eq!(label.args[1], ArgSource::Literal(json!("$deployer")));

        let vault = &plan.contracts[1];
        assert!(!vault.verify);
        assert_eq!(vault.record_stem(), "akashic-vault");
        assert_eq!(
            vault.args[0],
            ArgSource::Deployed {
                contract: "AkashicRecordsLabel".into()
            }
        );
    }

    #[test]
    fn test_parse_json_plan() {
        let plan = DeploymentPlan::from_json_str(
            r#"{ "contracts": [{ "name": "DivineLogicGate" }] }"#,
        )
        .unwrap();
        assert!(plan.contracts[0].args.is_empty());
        assert!(plan.contracts[0].fields.is_empty());
    }

    #[test]
    fn test_rejects_bad_plans() {
        assert!(DeploymentPlan::from_toml_str("contracts = []").is_err());
        assert!(DeploymentPlan::from_toml_str(
            "[[contracts]]\nname = \"A\"\n[[contracts]]\nname = \"A\"\n"
        )
        .is_err());
        assert!(DeploymentPlan::from_toml_str(
            "[[contracts]]\nname = \"A\"\nrecord = \"x\"\n[[contracts]]\nname = \"B\"\nrecord = \"x\"\n"
        )
        .is_err());
        assert!(DeploymentPlan::from_toml_str(
            "[[contracts]]\nname = \"A\"\n[contracts.fields]\ntransactionHash = \"0x\"\n"
        )
        .is_err());
        assert!(DeploymentPlan::from_toml_str(
            "[[contracts]]\nname = \"A\"\n[contracts.fields]\nnetwork = \"polygon\"\n"
        )
        .is_err());
        assert!(DeploymentPlan::from_toml_str("[[contracts]]\nname = \"A\"\nrecord = \"../a\"\n").is_err());
        assert!(DeploymentPlan::from_toml_str("[[contracts]]\nname = \"A\"\nbogus = 1\n").is_err());
    }

    #[test]
    fn test_select() {
        let plan = DeploymentPlan::from_toml_str(SUITE).unwrap();

        assert_eq!(plan.select(&[]).unwrap().len(), 2);

        let only = plan.select(&["AkashicTreasuryVault".to_owned()]).unwrap();
        assert_eq!(only.len(), 1);
        assert_eq!(only[0].name, "AkashicTreasuryVault");

        assert!(plan.select(&["Nope".to_owned()]).is_err());
    }

    #[test]
    fn test_bundled_plans_are_valid() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../plans");
        let mut count = 0;
        for entry in fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            DeploymentPlan::load(&path).unwrap();
            count += 1;
        }
        assert!(count > 0);
    }

    #[test]
    fn test_load_by_extension() {
        let tmp = tempfile::TempDir::new().unwrap();
        let toml_path = tmp.path().join("suite.toml");
        fs::write(&toml_path, SUITE).unwrap();
        let json_path = tmp.path().join("gate.json");
        fs::write(&json_path, r#"{ "contracts": [{ "name": "DivineLogicGate" }] }"#).unwrap();

        assert_eq!(DeploymentPlan::load(&toml_path).unwrap().contracts.len(), 2);
        assert_eq!(DeploymentPlan::load(&json_path).unwrap().contracts.len(), 1);
    }

    #[test]
    fn test_record_stem_of_custom_record() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../plans/de_coin.toml");
        let plan = DeploymentPlan::load(&path).unwrap();

        assert_eq!(plan.record_stem_of("DivineEssenceCoin").as_deref(), Some("de-coin"));
        assert_eq!(plan.record_stem_of("de-coin").as_deref(), Some("de-coin"));
        assert_eq!(plan.record_stem_of("TruthCoin"), None);
    }
}
