use std::path::Path;

use anyhow::{anyhow, Context, Result};
use contract_deployer::{
    config::RecordsLocation, ethers_client::get_writer_ethers_client, DeployerConfig,
    DeploymentPlan, DeploymentRunner,
};
use deployment_records::{naming::record_stem_for, DeploymentRecorder};
use tracing::info;

use crate::cli::{DeployArgs, ShowArgs};

pub async fn deploy(args: DeployArgs) -> Result<()> {
    let mut config = DeployerConfig::load_for_network(args.network.as_deref())?;
    if let Some(dir) = args.deployments_dir {
        config.deployments_dir = dir;
    }
    if let Some(dir) = args.artifacts_dir {
        config.artifacts_dir = dir;
    }

    let plan = DeploymentPlan::load(&args.plan)?;
    info!(
        plan = %args.plan.display(),
        network = %config.network,
        rpc_url = %config.rpc_url,
        "loaded deployment plan"
    );

    let client = get_writer_ethers_client(&config).await?;
    let mut runner = DeploymentRunner::connect(client, &config).await?;
    let summaries = runner.run(&plan, &args.only).await?;

    println!("Deployment summary ({}):", config.network);
    for summary in &summaries {
        println!(
            "  {:<32} {:?}  {}",
            summary.contract_name,
            summary.address,
            summary.record_path.display()
        );
    }
    Ok(())
}

pub fn show(args: ShowArgs) -> Result<()> {
    let mut location = RecordsLocation::load(args.network.as_deref());
    if let Some(dir) = args.deployments_dir {
        location.deployments_dir = dir;
    }

    let recorder = DeploymentRecorder::new(&location.deployments_dir);
    let stem = record_stem(&args.contract, args.plan.as_deref())?;
    let record = recorder.read(&stem, &location.network).with_context(|| {
        format!("no deployment record for {} on {}", args.contract, location.network)
    })?;

    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

fn record_stem(contract: &str, plan: Option<&Path>) -> Result<String> {
    let Some(path) = plan else {
        return Ok(record_stem_for(contract));
    };
    DeploymentPlan::load(path)?
        .record_stem_of(contract)
        .ok_or_else(|| anyhow!("{contract} is not part of plan {}", path.display()))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn plan(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("../plans").join(name)
    }

    #[test]
    fn test_record_stem() {
        assert_eq!(record_stem("DivineEssenceCoin", None).unwrap(), "divine-essence-coin");
        assert_eq!(
            record_stem("DivineEssenceCoin", Some(&plan("de_coin.toml"))).unwrap(),
            "de-coin"
        );
        assert!(record_stem("TruthCoin", Some(&plan("de_coin.toml"))).is_err());
    }
}
