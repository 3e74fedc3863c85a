use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use challenger_cli::cli::{
    cmd_authorities, cmd_learn, cmd_run, cmd_verify, LearnArgs, RunArgs, VerifyArgs,
};
use challenger_cli::{App, AppConfig};

#[derive(Parser)]
#[command(name = "challenger", version, about = "Automated parking-charge challenge submission")]
struct Cli {
    /// Path to a challenger.toml configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Probe an authority's portal and draft a recipe for review.
    Learn(LearnArgs),
    /// Execute a challenge against an authority's portal.
    Run(RunArgs),
    /// Re-verify an authority's recipe without submitting.
    Verify(VerifyArgs),
    /// List authorities with hand-written adapters.
    Authorities,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;
    let app = App::bootstrap(config)?;

    match cli.command {
        Command::Learn(args) => cmd_learn(&app, args).await,
        Command::Run(args) => cmd_run(&app, args).await,
        Command::Verify(args) => cmd_verify(&app, args).await,
        Command::Authorities => cmd_authorities(&app).await,
    }
}
