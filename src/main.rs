//! stackcast - Main Entry Point
//!
//! Batch trainer for the specialist-ensemble forecaster.

use clap::Parser;
use stackcast::cli::{cmd_predict, cmd_train, Cli, Commands};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stackcast=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train { train, test, features, config, target, seed, output } => {
            cmd_train(
                &train,
                &test,
                &features,
                config.as_ref(),
                target.as_deref(),
                seed,
                &output,
            )?;
        }
        Commands::Predict { bundle, data, output } => {
            cmd_predict(&bundle, &data, &output)?;
        }
    }

    Ok(())
}
