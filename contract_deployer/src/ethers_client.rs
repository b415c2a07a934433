use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use ethers::{
    core::k256::ecdsa::SigningKey,
    middleware::SignerMiddleware,
    providers::{Http, Middleware, Provider},
    signers::{coins_bip39::English, LocalWallet, MnemonicBuilder, Signer, Wallet},
};
use tracing::debug;

use crate::config::{DeployerConfig, SignerSource};

pub type EtherSigner = SignerMiddleware<Provider<Http>, Wallet<SigningKey>>;

pub fn build_wallet(source: &SignerSource, chain_id: u64) -> Result<LocalWallet> {
    let wallet = match source {
        SignerSource::Mnemonic { phrase, index } => MnemonicBuilder::<English>::default()
            .phrase(phrase.as_str())
            .index(*index)
            .map_err(|e| anyhow!("invalid signer index {index}: {e}"))?
            .build()
            .map_err(|e| anyhow!("failed to derive wallet from mnemonic: {e}"))?,
        SignerSource::PrivateKey(key) => key
            .trim_start_matches("0x")
            .parse::<LocalWallet>()
            .map_err(|e| anyhow!("failed to parse private key: {e}"))?,
    };

    Ok(wallet.with_chain_id(chain_id))
}

/// Connects to the configured RPC and wraps it with the deployer's signer.
///
/// When no chain id is configured it is asked from the node first, so the
/// signer never signs for the wrong chain.
pub async fn get_writer_ethers_client(config: &DeployerConfig) -> Result<Arc<EtherSigner>> {
    let provider = Provider::<Http>::try_from(config.rpc_url.as_str())
        .with_context(|| format!("failed to create provider for {}", config.rpc_url))?;

    let chain_id = match config.chain_id {
        Some(id) => id,
        None => provider
            .get_chainid()
            .await
            .with_context(|| format!("failed to query chain id from {}", config.rpc_url))?
            .as_u64(),
    };
    debug!(chain_id, rpc_url = %config.rpc_url, "connected to rpc");

    let wallet = build_wallet(&config.signer, chain_id)?;
    Ok(Arc::new(SignerMiddleware::new(provider, wallet)))
}

#[cfg(test)]
mod tests {
    use super::*;

    // hardhat account #0 for the default dev mnemonic
    const HARDHAT_ACCOUNT_0: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

    #[test]
    fn test_wallet_from_dev_mnemonic() {
        let source = DeployerConfig::local().signer;
        let wallet = build_wallet(&source, 31337).unwrap();

        assert_eq!(format!("{:?}", wallet.address()), HARDHAT_ACCOUNT_0);
        assert_eq!(wallet.chain_id(), 31337);
    }

    #[test]
    fn test_wallet_from_private_key() {
        let source = SignerSource::PrivateKey(
            "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80".to_owned(),
        );
        let wallet = build_wallet(&source, 137).unwrap();

        assert_eq!(format!("{:?}", wallet.address()), HARDHAT_ACCOUNT_0);
        assert_eq!(wallet.chain_id(), 137);
    }

    #[test]
    fn test_bad_private_key() {
        let source = SignerSource::PrivateKey("nope".to_owned());
        assert!(build_wallet(&source, 1).is_err());
    }
}
