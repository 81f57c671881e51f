//! fraudclf - Main Entry Point

use clap::Parser;
use fraudclf::cli::{cmd_info, cmd_init_config, cmd_train, Cli, Commands};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fraudclf=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train { data, config, model_out, metrics_out, jobs } => {
            cmd_train(&data, &config, &model_out, &metrics_out, jobs)?;
        }
        Commands::Info { data, config, delimiter } => {
            cmd_info(&data, config.as_deref(), delimiter)?;
        }
        Commands::InitConfig { label, output } => {
            cmd_init_config(&label, &output)?;
        }
    }

    Ok(())
}
