use std::{collections::HashMap, env, path::PathBuf, sync::Arc};

use anyhow::{anyhow, Context, Result};
use deployment_records::DeploymentRecorder;
use ethers::{providers::Middleware, types::Address, utils::format_ether};
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use crate::{
    args::{resolve_constructor_args, ArgContext, ResolvedArg},
    artifact::ContractArtifact,
    config::{is_local_network, DeployerConfig},
    deployer::{ContractDeployer, DeployedContract},
    plan::{ContractPlan, DeploymentPlan},
    verify::{verify_on_explorer, Verification},
};

type EnvLookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

#[derive(Clone, Debug, PartialEq)]
pub struct DeploymentSummary {
    pub contract_name: String,
    pub address: Address,
    pub record_path: PathBuf,
}

/// Deploys the contracts of a plan one after another, recording each one.
pub struct DeploymentRunner<M> {
    deployer: ContractDeployer<M>,
    recorder: DeploymentRecorder,
    artifacts_dir: PathBuf,
    network: String,
    chain_id: u64,
    deployer_address: Address,
    etherscan_api_key: Option<String>,
    lookup: EnvLookup,
    deployed: HashMap<String, Address>,
}

impl<M> DeploymentRunner<M>
where
    M: Middleware + 'static,
{
    /// The deployer address is the client's default sender, i.e. the signer.
    pub async fn connect(client: Arc<M>, config: &DeployerConfig) -> Result<Self> {
        let deployer_address = client
            .default_sender()
            .ok_or_else(|| anyhow!("client has no signer to deploy with"))?;
        let chain_id = match config.chain_id {
            Some(id) => id,
            None => client
                .get_chainid()
                .await
                .map_err(|e| anyhow!("failed to query chain id: {e}"))?
                .as_u64(),
        };

        Ok(Self {
            deployer: ContractDeployer::new(client, config.confirmations()),
            recorder: DeploymentRecorder::new(&config.deployments_dir),
            artifacts_dir: config.artifacts_dir.clone(),
            network: config.network.clone(),
            chain_id,
            deployer_address,
            etherscan_api_key: config.etherscan_api_key.clone(),
            lookup: Box::new(|key| env::var(key).ok()),
            deployed: HashMap::new(),
        })
    }

    /// Replaces the environment as the source of `{ env = .. }` arguments.
    pub fn with_lookup(
        mut self,
        lookup: impl Fn(&str) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.lookup = Box::new(lookup);
        self
    }

    pub fn deployed(&self) -> &HashMap<String, Address> {
        &self.deployed
    }

    pub async fn run(
        &mut self,
        plan: &DeploymentPlan,
        only: &[String],
    ) -> Result<Vec<DeploymentSummary>> {
        let selected = plan.select(only)?;

        let balance = self.deployer.balance(self.deployer_address).await?;
        info!(
            deployer = ?self.deployer_address,
            balance = %format_ether(balance),
            network = %self.network,
            chain_id = self.chain_id,
            contracts = selected.len(),
            "starting deployment"
        );

        let total = selected.len();
        let mut summaries = Vec::with_capacity(total);
        for (i, contract) in selected.into_iter().enumerate() {
            info!(step = i + 1, total, contract = %contract.name, "deploying");
            let summary = self
                .deploy_contract(contract)
                .await
                .with_context(|| format!("deployment of {} failed", contract.name))?;
            summaries.push(summary);
        }

        Ok(summaries)
    }

    pub async fn deploy_contract(&mut self, contract: &ContractPlan) -> Result<DeploymentSummary> {
        let artifact = ContractArtifact::load(&self.artifacts_dir, &contract.name)?;

        let ctx = ArgContext {
            deployer: self.deployer_address,
            deployed: &self.deployed,
            lookup: &*self.lookup,
        };
        let args = resolve_constructor_args(artifact.abi.constructor(), &contract.args, &ctx)?;
        for arg in &args {
            info!(contract = %contract.name, arg = %arg.name, value = %arg.raw, "constructor argument");
        }

        let tokens = args.iter().map(|a| a.token.clone()).collect::<Vec<_>>();
        let encoded_args = ethers::abi::encode(&tokens);

        let deployed = self.deployer.deploy(&artifact, tokens).await?;
        info!(
            contract = %contract.name,
            address = ?deployed.address,
            tx = ?deployed.transaction_hash,
            "contract deployed"
        );
        self.deployed.insert(contract.name.clone(), deployed.address);

        let onchain = if contract.readbacks.is_empty() {
            None
        } else {
            let values = self
                .deployer
                .read_back(&artifact.abi, deployed.address, &contract.readbacks)
                .await?;
            for (name, value) in &values {
                info!(contract = %contract.name, function = %name, %value, "read back");
            }
            Some(values)
        };

        let fields = record_fields(
            contract,
            self.chain_id,
            &deployed,
            &args,
            &encoded_args,
            onchain,
        );
        let (_, record_path) = self.recorder.record(
            &contract.record_stem(),
            &self.network,
            &format!("{:?}", deployed.address),
            &format!("{:?}", self.deployer_address),
            fields,
        )?;

        if contract.verify {
            self.verify(&artifact, deployed.address, &encoded_args).await;
        }

        Ok(DeploymentSummary {
            contract_name: contract.name.clone(),
            address: deployed.address,
            record_path,
        })
    }
}

impl<M> DeploymentRunner<M> {
    /// Explorer verification never fails the deployment, problems are only logged.
    async fn verify(&self, artifact: &ContractArtifact, address: Address, encoded_args: &[u8]) {
        let name = &artifact.contract_name;
        if is_local_network(&self.network) {
            warn!(contract = %name, network = %self.network, "skipping verification on a local network");
            return;
        }

        let hint = verification_hint(self.chain_id, address, name, encoded_args);
        let Some(api_key) = &self.etherscan_api_key else {
            info!(command = %hint, "ETHERSCAN_API_KEY not set, verify on the block explorer with");
            return;
        };

        let verified = match Verification::prepare(&self.artifacts_dir, artifact, address, encoded_args) {
            Ok(verification) => verify_on_explorer(self.chain_id, api_key, &verification).await,
            Err(e) => Err(e),
        };
        if let Err(e) = verified {
            warn!(contract = %name, error = %format!("{e:#}"), "explorer verification failed");
            info!(command = %hint, "verify on the block explorer with");
        }
    }
}

/// Free-form record fields for one deployment. Plan fields come last.
pub fn record_fields(
    contract: &ContractPlan,
    chain_id: u64,
    deployed: &DeployedContract,
    args: &[ResolvedArg],
    encoded_args: &[u8],
    onchain: Option<Map<String, Value>>,
) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert("contractName".into(), json!(contract.name));
    fields.insert("chainId".into(), json!(chain_id));
    fields.insert(
        "transactionHash".into(),
        json!(format!("{:?}", deployed.transaction_hash)),
    );
    if let Some(block) = deployed.block_number {
        fields.insert("blockNumber".into(), json!(block.as_u64()));
    }
    if let Some(gas) = deployed.gas_used {
        fields.insert("gasUsed".into(), json!(gas.to_string()));
    }

    let constructor_args: Map<String, Value> = args
        .iter()
        .map(|a| (a.name.clone(), Value::String(a.raw.clone())))
        .collect();
    fields.insert("constructorArguments".into(), Value::Object(constructor_args));
    fields.insert(
        "encodedConstructorArgs".into(),
        json!(format!("0x{}", hex::encode(encoded_args))),
    );
    if let Some(onchain) = onchain {
        fields.insert("onchain".into(), Value::Object(onchain));
    }

    fields.extend(contract.fields.clone());
    fields
}

pub fn verification_hint(
    chain_id: u64,
    address: Address,
    contract_name: &str,
    encoded_args: &[u8],
) -> String {
    let mut command = format!("forge verify-contract --chain {chain_id}");
    if !encoded_args.is_empty() {
        command.push_str(&format!(
            " --constructor-args 0x{}",
            hex::encode(encoded_args)
        ));
    }
    command.push_str(&format!(" {address:?} {contract_name}"));
    command
}
