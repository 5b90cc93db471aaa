//! taskdesk - personal task tracker server

use anyhow::Context;
use clap::Parser;
use taskdesk_core::ConfigLoader;
use taskdesk_server::{logging, migrate, serve, Cli, Commands};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = ConfigLoader::new()
        .with_config_file(cli.config.as_ref())
        .with_overrides(cli.overrides())
        .with_validation(cli.requires_valid_config())
        .load()
        .context("Failed to load configuration")?;

    let _guard = logging::init(config.log_format, cli.verbose, config.log_dir.as_deref())
        .context("Failed to initialize logging")?;

    match cli.command {
        Commands::Serve { .. } => serve(&config).await?,
        Commands::Migrate { .. } => migrate(&config).await?,
        Commands::CheckConfig => {
            info!("Configuration is valid");
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
