pub mod args;
pub mod artifact;
pub mod config;
pub mod deployer;
pub mod ethers_client;
pub mod plan;
pub mod runner;
pub mod tokens;
pub mod verify;

pub use config::DeployerConfig;
pub use plan::DeploymentPlan;
pub use runner::{DeploymentRunner, DeploymentSummary};

#[cfg(test)]
pub mod test_utils {
    use std::sync::Arc;

    use crate::{
        config::DeployerConfig,
        ethers_client::{get_writer_ethers_client, EtherSigner},
    };

    /// Reads `.env` like the binary does; falls back to a local hardhat node.
    pub fn load_test_config() -> DeployerConfig {
        DeployerConfig::load().unwrap()
    }

    pub async fn get_test_ethers_client(config: &DeployerConfig) -> Arc<EtherSigner> {
        get_writer_ethers_client(config).await.unwrap()
    }
}
