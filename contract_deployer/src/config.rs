use std::{env, path::PathBuf};

use anyhow::{anyhow, Context, Result};
use url::Url;

const RPC_URL_ENV_VAR: &str = "RPC_URL";
const NETWORK_ENV_VAR: &str = "NETWORK";
const CHAIN_ID_ENV_VAR: &str = "CHAIN_ID";
const MNEMONIC_ENV_VAR: &str = "MNEMONIC";
const PRIVATE_KEY_ENV_VAR: &str = "PRIVATE_KEY";
const SIGNER_INDEX_ENV_VAR: &str = "SIGNER_INDEX";
const DEPLOYMENTS_DIR_ENV_VAR: &str = "DEPLOYMENTS_DIR";
const ARTIFACTS_DIR_ENV_VAR: &str = "ARTIFACTS_DIR";
const CONFIRMATIONS_ENV_VAR: &str = "CONFIRMATIONS";
const ETHERSCAN_API_KEY_ENV_VAR: &str = "ETHERSCAN_API_KEY";

const DEFAULT_RPC_URL: &str = "http://localhost:8545";
const DEFAULT_NETWORK: &str = "localhost";
// the well known hardhat / anvil dev mnemonic. only ever used against a local node
const DEFAULT_LOCAL_MNEMONIC: &str = "test test test test test test test test test test test junk";
const DEFAULT_DEPLOYMENTS_DIR: &str = "deployments";
const DEFAULT_ARTIFACTS_DIR: &str = "artifacts";
const LOCAL_CONFIRMATIONS: usize = 1;
const REMOTE_CONFIRMATIONS: usize = 5;

pub const LOCAL_NETWORKS: [&str; 2] = ["hardhat", "localhost"];

pub fn is_local_network(network: &str) -> bool {
    LOCAL_NETWORKS.contains(&network)
}

#[derive(Clone, Debug, PartialEq)]
pub enum SignerSource {
    Mnemonic { phrase: String, index: u32 },
    PrivateKey(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct DeployerConfig {
    pub rpc_url: String,
    pub network: String,
    /// queried from the RPC when not configured
    pub chain_id: Option<u64>,
    pub signer: SignerSource,
    pub deployments_dir: PathBuf,
    pub artifacts_dir: PathBuf,
    /// defaults by network, see [`DeployerConfig::confirmations`]
    pub confirmations: Option<usize>,
    /// explorer verification is submitted only when set
    pub etherscan_api_key: Option<String>,
}

/// Wraps `lookup` so `NETWORK` resolves to `network` when one is given,
/// e.g. from a command line flag.
pub fn with_network(
    lookup: impl Fn(&str) -> Option<String>,
    network: Option<&str>,
) -> impl Fn(&str) -> Option<String> {
    let network = network.map(str::to_owned);
    move |key: &str| match &network {
        Some(network) if key == NETWORK_ENV_VAR => Some(network.clone()),
        _ => lookup(key),
    }
}

/// Where records of a network live. Unlike [`DeployerConfig`] this needs no signer.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordsLocation {
    pub network: String,
    pub deployments_dir: PathBuf,
}

impl RecordsLocation {
    pub fn load(network: Option<&str>) -> Self {
        dotenv::dotenv().ok();
        Self::from_lookup(with_network(|key| env::var(key).ok(), network))
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            network: var(NETWORK_ENV_VAR).unwrap_or_else(|| DEFAULT_NETWORK.to_owned()),
            deployments_dir: var(DEPLOYMENTS_DIR_ENV_VAR)
                .map(PathBuf::from)
                .unwrap_or_else(|| DEFAULT_DEPLOYMENTS_DIR.into()),
        }
    }
}

impl DeployerConfig {
    /// load from env (and `.env`), else local
    pub fn load() -> Result<Self> {
        Self::load_for_network(None)
    }

    /// Like [`DeployerConfig::load`] with `network` standing in for `NETWORK`,
    /// so signer and confirmation defaults follow the network actually used.
    pub fn load_for_network(network: Option<&str>) -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(with_network(|key| env::var(key).ok(), network))
    }

    pub fn local() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_owned(),
            network: DEFAULT_NETWORK.to_owned(),
            chain_id: None,
            signer: SignerSource::Mnemonic {
                phrase: DEFAULT_LOCAL_MNEMONIC.to_owned(),
                index: 0,
            },
            deployments_dir: DEFAULT_DEPLOYMENTS_DIR.into(),
            artifacts_dir: DEFAULT_ARTIFACTS_DIR.into(),
            confirmations: None,
            etherscan_api_key: None,
        }
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let network = var(NETWORK_ENV_VAR).unwrap_or_else(|| DEFAULT_NETWORK.to_owned());

        let Some(rpc_url) = var(RPC_URL_ENV_VAR) else {
            if !is_local_network(&network) {
                return Err(anyhow!("{RPC_URL_ENV_VAR} must be set for network {network}"));
            }
            let mut config = Self::local();
            config.network = network;
            config.apply_dirs(&var);
            return Ok(config);
        };
        Url::parse(&rpc_url).with_context(|| format!("invalid {RPC_URL_ENV_VAR}: {rpc_url}"))?;

        let chain_id = var(CHAIN_ID_ENV_VAR)
            .map(|v| v.parse::<u64>())
            .transpose()
            .with_context(|| format!("invalid {CHAIN_ID_ENV_VAR}"))?;

        let signer = match (var(PRIVATE_KEY_ENV_VAR), var(MNEMONIC_ENV_VAR)) {
            (Some(key), _) => SignerSource::PrivateKey(key),
            (None, Some(phrase)) => SignerSource::Mnemonic {
                phrase,
                index: var(SIGNER_INDEX_ENV_VAR)
                    .map(|v| v.parse::<u32>())
                    .transpose()
                    .with_context(|| format!("invalid {SIGNER_INDEX_ENV_VAR}"))?
                    .unwrap_or(0),
            },
            (None, None) if is_local_network(&network) => Self::local().signer,
            (None, None) => {
                return Err(anyhow!(
                    "{MNEMONIC_ENV_VAR} or {PRIVATE_KEY_ENV_VAR} must be set for network {network}"
                ))
            }
        };

        let confirmations = var(CONFIRMATIONS_ENV_VAR)
            .map(|v| v.parse::<usize>())
            .transpose()
            .with_context(|| format!("invalid {CONFIRMATIONS_ENV_VAR}"))?;

        let mut config = Self {
            rpc_url,
            network,
            chain_id,
            signer,
            deployments_dir: DEFAULT_DEPLOYMENTS_DIR.into(),
            artifacts_dir: DEFAULT_ARTIFACTS_DIR.into(),
            confirmations,
            etherscan_api_key: var(ETHERSCAN_API_KEY_ENV_VAR),
        };
        config.apply_dirs(&var);
        Ok(config)
    }

    fn apply_dirs(&mut self, var: &impl Fn(&str) -> Option<String>) {
        if let Some(dir) = var(DEPLOYMENTS_DIR_ENV_VAR) {
            self.deployments_dir = dir.into();
        }
        if let Some(dir) = var(ARTIFACTS_DIR_ENV_VAR) {
            self.artifacts_dir = dir.into();
        }
    }

    /// Remote networks wait longer so explorers have indexed the contract before verifying.
    pub fn confirmations(&self) -> usize {
        match self.confirmations {
            Some(n) => n,
            None if self.is_local() => LOCAL_CONFIRMATIONS,
            None => REMOTE_CONFIRMATIONS,
        }
    }

    pub fn is_local(&self) -> bool {
        is_local_network(&self.network)
    }
}
