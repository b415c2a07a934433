use std::{fs, path::Path, time::Duration};

use anyhow::{anyhow, Context, Result};
use ethers::{
    etherscan::{
        verify::{CodeFormat, VerifyContract},
        Client,
    },
    types::{Address, Chain},
};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::artifact::ContractArtifact;

const STATUS_POLL_INTERVAL: Duration = Duration::from_secs(5);
const STATUS_POLL_ATTEMPTS: usize = 12;

/// One compiler run as written to `build-info/` by hardhat and foundry.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    solc_version: Option<String>,
    solc_long_version: Option<String>,
    /// standard json input
    pub input: Value,
}

impl BuildInfo {
    /// Finds the build info under `<artifacts_dir>/build-info` whose input compiled `source_name`.
    pub fn find(artifacts_dir: &Path, source_name: &str) -> Result<Self> {
        let dir = artifacts_dir.join("build-info");
        let mut paths = fs::read_dir(&dir)
            .with_context(|| format!("failed to read {}", dir.display()))?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<Result<Vec<_>, _>>()?;
        paths.sort();

        for path in paths {
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let contents =
                fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
            let info: BuildInfo = serde_json::from_slice(&contents)
                .with_context(|| format!("invalid build info {}", path.display()))?;
            if info.compiles(source_name) {
                debug!(path = %path.display(), source = source_name, "found build info");
                return Ok(info);
            }
        }

        Err(anyhow!(
            "no build info under {} compiles {source_name}",
            dir.display()
        ))
    }

    fn compiles(&self, source_name: &str) -> bool {
        self.input
            .get("sources")
            .and_then(|sources| sources.get(source_name))
            .is_some()
    }

    /// Explorer style compiler version, e.g. `v0.8.20+commit.a1b79de6`.
    pub fn compiler_version(&self) -> Result<String> {
        let version = self
            .solc_long_version
            .as_deref()
            .or(self.solc_version.as_deref())
            .ok_or_else(|| anyhow!("build info has no compiler version"))?;
        Ok(format!("v{}", version.trim_start_matches('v')))
    }
}

/// Everything an explorer needs to verify one deployed contract.
#[derive(Clone, Debug, PartialEq)]
pub struct Verification {
    pub address: Address,
    /// fully qualified, `contracts/TruthCoin.sol:TruthCoin`
    pub contract: String,
    pub standard_json: String,
    pub compiler_version: String,
    /// hex without `0x`, empty when the constructor takes nothing
    pub constructor_args: String,
}

impl Verification {
    pub fn prepare(
        artifacts_dir: &Path,
        artifact: &ContractArtifact,
        address: Address,
        encoded_args: &[u8],
    ) -> Result<Self> {
        let source_name = artifact.source_name.as_deref().ok_or_else(|| {
            anyhow!(
                "artifact {} does not name its source file",
                artifact.source.display()
            )
        })?;
        let build_info = BuildInfo::find(artifacts_dir, source_name)?;

        Ok(Self {
            address,
            contract: format!("{source_name}:{}", artifact.contract_name),
            standard_json: serde_json::to_string(&build_info.input)?,
            compiler_version: build_info.compiler_version()?,
            constructor_args: hex::encode(encoded_args),
        })
    }

    fn request(&self) -> VerifyContract {
        let constructor_args =
            (!self.constructor_args.is_empty()).then(|| self.constructor_args.clone());
        VerifyContract::new(
            self.address,
            self.contract.clone(),
            self.standard_json.clone(),
            self.compiler_version.clone(),
        )
        .code_format(CodeFormat::StandardJsonInput)
        .constructor_arguments(constructor_args)
    }
}

fn is_already_verified(result: &str) -> bool {
    result.to_lowercase().contains("already verified")
}

/// Submits `verification` to the chain's etherscan compatible explorer and waits for the verdict.
pub async fn verify_on_explorer(
    chain_id: u64,
    api_key: &str,
    verification: &Verification,
) -> Result<()> {
    let chain = Chain::try_from(chain_id)
        .map_err(|_| anyhow!("no block explorer known for chain {chain_id}"))?;
    let client = Client::new(chain, api_key)
        .with_context(|| format!("no explorer api for chain {chain_id}"))?;

    let response = client
        .submit_contract_verification(&verification.request())
        .await
        .context("failed to submit verification")?;
    if is_already_verified(&response.result) {
        info!(address = ?verification.address, "contract is already verified");
        return Ok(());
    }
    if response.status != "1" {
        return Err(anyhow!("verification rejected: {}", response.result));
    }

    let guid = response.result;
    debug!(%guid, contract = %verification.contract, "verification submitted");
    for _ in 0..STATUS_POLL_ATTEMPTS {
        tokio::time::sleep(STATUS_POLL_INTERVAL).await;
        let status = client
            .check_contract_verification_status(&guid)
            .await
            .context("failed to check verification status")?;

        if status.result.contains("Pending") {
            continue;
        }
        if status.status == "1" || is_already_verified(&status.result) {
            info!(address = ?verification.address, contract = %verification.contract, "contract verified");
            return Ok(());
        }
        return Err(anyhow!("verification failed: {}", status.result));
    }

    Err(anyhow!("verification {guid} still pending, check the explorer later"))
}
