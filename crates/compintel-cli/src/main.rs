mod analyze;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::analyze::AnalyzeArgs;

#[derive(Debug, Parser)]
#[command(name = "compintel")]
#[command(about = "Competitive-intelligence collection and benchmarking")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Profile a company and benchmark it against its closest competitors
    Analyze(AnalyzeArgs),
    /// Print the effective configuration, secrets redacted
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = compintel_core::load_analysis_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Analyze(args) => analyze::run_analyze(config, &args).await,
        Commands::Config => {
            println!("{config:#?}");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests;
