//! mycsv - Main Entry Point

use clap::Parser;
use mycsv_automl::cli::{cmd_clean, cmd_info, cmd_predict, cmd_train, Cli, Commands};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mycsv_automl=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Clean { data, output, columns, clean_columns, config } => {
            cmd_clean(&data, &output, columns, clean_columns, config.as_deref())?;
        }
        Commands::Train { data, target, output, columns, cv_folds, config } => {
            cmd_train(&data, target, &output, columns, cv_folds, config.as_deref())?;
        }
        Commands::Predict { model, data, output } => {
            cmd_predict(&model, &data, &output)?;
        }
        Commands::Info { data, rows } => {
            cmd_info(&data, rows)?;
        }
    }

    Ok(())
}
