//! Pageview forecast - Main Entry Point

use clap::Parser;
use pageview_forecast::cli::{cmd_config, cmd_features, cmd_info, cmd_run, Cli, Commands};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pageview_forecast=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => {
            cmd_run(&args)?;
        }
        Commands::Features { data, lags, no_calendar, output } => {
            cmd_features(&data, lags, no_calendar, &output)?;
        }
        Commands::Info { data } => {
            cmd_info(&data)?;
        }
        Commands::Config => {
            cmd_config()?;
        }
    }

    Ok(())
}
