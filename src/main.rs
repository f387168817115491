mod checkpoint;
mod cli;
mod config;
mod download;
mod error;
mod reading;
mod report;
mod tasks;

use anyhow::Result;
use clap::Parser;
use cli::{command, Cli, Commands};
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "weatherlog=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Run(args) => command::run(args).await,
        Commands::Compile(args) => command::compile(args).await,
    };

    match result {
        Ok(paths) => {
            for path in paths {
                println!("File saved to `{}`", path.display());
            }
        }
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}
