use aave_proposal::{
    ProposalFetcher,
    config::AppConfig,
    errors::{AppError, FetchError},
    input::SUPPORTED_FORMATS,
    report::{render_report, render_schema},
};
use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use dotenv::dotenv;
use std::path::PathBuf;
use tracing::error;
use utils::tracing::setup_tracing;

/// Look up an Aave Governance V3 proposal and print its status, votes and voting window.
#[derive(Parser, Debug)]
#[command(name = "aave-proposal", version, about)]
struct Cli {
    /// Proposal ID or an app.aave.com / governance.aave.com URL
    proposal: String,

    /// Discover the subgraph schema first and shape the query after it
    #[arg(long)]
    introspect: bool,

    /// YAML config file (defaults to $AAVE_PROPOSAL_CONFIG)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    setup_tracing("warn");

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        report_failure(&e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let mut fetcher =
        ProposalFetcher::from_config(&config).context("Failed to set up data sources")?;

    if cli.introspect {
        let schema = fetcher.introspect(&cli.proposal).await?;
        println!("{}", render_schema(&schema));
    }

    let report = fetcher.fetch(&cli.proposal, Utc::now()).await?;
    println!("{}", render_report(&report));

    Ok(())
}

fn report_failure(err: &anyhow::Error) {
    error!(error = ?err, "Run failed");

    match err.downcast_ref::<AppError>() {
        Some(AppError::Input(e)) => {
            eprintln!("Could not read a proposal ID: {e}");
            eprintln!("\nSupported formats:");
            for format in SUPPORTED_FORMATS {
                eprintln!("  - {format}");
            }
        }
        Some(AppError::Fetch(FetchError::NotFound(id))) => {
            eprintln!("No proposal found with ID: {id}");
        }
        Some(AppError::Fetch(e)) => {
            eprintln!("Subgraph query failed: {e}");
        }
        None => {
            eprintln!("Error: {err:#}");
        }
    }
}
