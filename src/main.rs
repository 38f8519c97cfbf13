//! Loanfund - Main Entry Point

use clap::Parser;
use loanfund::cli::{
    cmd_compare, cmd_features, cmd_info, cmd_predict, cmd_train, resolve_config, Cli, Commands,
};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "loanfund=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Info { data } => {
            cmd_info(&data)?;
        }
        Commands::Features { data, output } => {
            cmd_features(&data, &output)?;
        }
        Commands::Compare { data, config, folds, seed, stratified, unseen, output } => {
            let config = resolve_config(config.as_deref(), folds, seed, stratified, unseen)?;
            cmd_compare(&data, config, output.as_deref())?;
        }
        Commands::Train { data, model, config, seed, unseen, output } => {
            let config = resolve_config(config.as_deref(), None, seed, false, unseen)?;
            cmd_train(&data, model, config, &output)?;
        }
        Commands::Predict { model, data, output } => {
            cmd_predict(&model, &data, output.as_deref())?;
        }
    }

    Ok(())
}
