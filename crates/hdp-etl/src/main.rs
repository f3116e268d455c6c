//! HDP ETL - data refresh tool

use anyhow::Result;
use clap::Parser;
use hdp_common::logging::{init_logging, LogConfig, LogLevel};
use hdp_etl::{config::EtlConfig, etl::EtlService};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "hdp-etl")]
#[command(author, version, about = "HDP data ingestion and reconciliation tool")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Parser, Debug)]
enum Command {
    /// Run a full refresh of all tables
    Run,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut log_config = LogConfig::from_env()?.with_file_prefix("hdp-etl");
    if cli.verbose {
        log_config = log_config.with_level(LogLevel::Debug);
    }
    init_logging(&log_config)?;

    match cli.command {
        Command::Run => {
            let config = EtlConfig::load()?;
            let service = EtlService::from_config(config).await?;
            let result = service.run_full_refresh().await?;
            info!(%result, total = result.total(), "Refresh complete");
        },
    }

    Ok(())
}
