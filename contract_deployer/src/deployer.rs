use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use ethers::{
    abi::{Abi, Token},
    contract::ContractFactory,
    providers::Middleware,
    types::{transaction::eip2718::TypedTransaction, Address, TransactionRequest, H256, U256, U64},
};
use serde_json::{Map, Value};
use tracing::debug;

use crate::{artifact::ContractArtifact, tokens::outputs_to_json};

#[derive(Clone, Debug, PartialEq)]
pub struct DeployedContract {
    pub address: Address,
    pub transaction_hash: H256,
    pub block_number: Option<U64>,
    pub gas_used: Option<U256>,
}

pub struct ContractDeployer<M> {
    client: Arc<M>,
    confirmations: usize,
}

impl<M> ContractDeployer<M>
where
    M: Middleware + 'static,
{
    pub fn new(client: Arc<M>, confirmations: usize) -> Self {
        Self {
            client,
            confirmations,
        }
    }

    pub fn client(&self) -> Arc<M> {
        self.client.clone()
    }

    pub async fn balance(&self, address: Address) -> Result<U256> {
        self.client
            .get_balance(address, None)
            .await
            .map_err(|e| anyhow!("failed to fetch balance of {address:?}: {e}"))
    }

    /// Submits the creation transaction and waits for the configured confirmations.
    pub async fn deploy(
        &self,
        artifact: &ContractArtifact,
        args: Vec<Token>,
    ) -> Result<DeployedContract> {
        let name = &artifact.contract_name;
        debug!(contract = %name, bytecode_len = artifact.bytecode.len(), "building deployment");

        let factory = ContractFactory::new(
            artifact.abi.clone(),
            artifact.bytecode.clone(),
            self.client.clone(),
        );

        let deployer = factory
            .deploy_tokens(args)
            .map_err(|e| anyhow!("failed to create deployment transaction for {name}: {e}"))?
            .confirmations(self.confirmations);

        let (contract, receipt) = deployer
            .send_with_receipt()
            .await
            .map_err(|e| anyhow!("failed to deploy {name}: {e}"))?;

        Ok(DeployedContract {
            address: contract.address(),
            transaction_hash: receipt.transaction_hash,
            block_number: receipt.block_number,
            gas_used: receipt.gas_used,
        })
    }

    /// Calls each named zero argument function on the deployed contract.
    pub async fn read_back(
        &self,
        abi: &Abi,
        address: Address,
        functions: &[String],
    ) -> Result<Map<String, Value>> {
        let mut values = Map::new();

        for name in functions {
            let function = abi
                .function(name)
                .with_context(|| format!("no function `{name}` in abi"))?;
            if !function.inputs.is_empty() {
                return Err(anyhow!(
                    "`{name}` takes arguments and cannot be read back"
                ));
            }

            let data = function.encode_input(&[])?;
            let tx: TypedTransaction = TransactionRequest::new().to(address).data(data).into();
            let output = self
                .client
                .call(&tx, None)
                .await
                .map_err(|e| anyhow!("call to `{name}` failed: {e}"))?;

            let tokens = function
                .decode_output(&output)
                .with_context(|| format!("unexpected output from `{name}`"))?;
            values.insert(name.clone(), outputs_to_json(&tokens));
        }

        Ok(values)
    }
}
