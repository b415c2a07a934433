mod cli;
mod commands;
mod logging;

use anyhow::Result;
use clap::Parser;
use tracing::error;

use crate::{
    cli::{Cli, Commands},
    logging::init_logging,
};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.debug);

    if let Err(e) = run(cli.command).await {
        error!("{e:#}");
        std::process::exit(1);
    }
}

async fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Deploy(args) => commands::deploy(args).await,
        Commands::Show(args) => commands::show(args),
    }
}
