use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "contract-deployer")]
#[command(about = "Deploy compiled contracts from a plan and keep a JSON record per deployment")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug logging
    #[arg(global = true, long, env = "DEPLOYER_DEBUG")]
    pub debug: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Deploy the contracts of a plan, in order
    Deploy(DeployArgs),

    /// Print a stored deployment record
    Show(ShowArgs),
}

#[derive(Args, Debug)]
pub struct DeployArgs {
    /// Plan file (.toml, or .json)
    pub plan: PathBuf,

    /// Network name written to the records (overrides NETWORK)
    #[arg(long)]
    pub network: Option<String>,

    /// Only deploy these contracts from the plan
    #[arg(long = "only", value_name = "CONTRACT")]
    pub only: Vec<String>,

    /// Where records are written (overrides DEPLOYMENTS_DIR)
    #[arg(long)]
    pub deployments_dir: Option<PathBuf>,

    /// Where compiled artifacts are looked up (overrides ARTIFACTS_DIR)
    #[arg(long)]
    pub artifacts_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Contract or record name, e.g. `TruthCoin` or `truth-coin`. Contracts with a
    /// custom `record` name need `--plan` or the record name itself
    pub contract: String,

    /// Plan the contract was deployed from, to find its record name
    #[arg(long)]
    pub plan: Option<PathBuf>,

    #[arg(long)]
    pub network: Option<String>,

    #[arg(long)]
    pub deployments_dir: Option<PathBuf>,
}
