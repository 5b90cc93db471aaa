//! taskdesk HTTP server
//!
//! Command-line entry points, request handlers and logging setup around
//! [`taskdesk_core`].

pub mod error;
pub mod extract;
pub mod logging;
pub mod routes;
pub mod state;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use taskdesk_core::{AppConfig, LogFormat, PartialConfig, TaskDatabase};
use tokio::net::TcpListener;
use tracing::info;

pub use routes::router;
pub use state::AppState;

#[derive(Parser, Debug)]
#[command(name = "taskdesk")]
#[command(about = "Personal task tracker with filtered listings and PDF reports")]
#[command(version)]
pub struct Cli {
    /// Configuration file (YAML)
    #[arg(long, short, global = true, env = "TASKDESK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Log output format: text or json
    #[arg(long, global = true)]
    pub log_format: Option<LogFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Start the HTTP server
    Serve {
        /// Address to listen on, e.g. 127.0.0.1:8000
        #[arg(long, short)]
        bind: Option<String>,
        /// Database URL, e.g. sqlite://taskdesk.db
        #[arg(long, short)]
        database: Option<String>,
    },
    /// Create or upgrade the database schema
    Migrate {
        /// Database URL, e.g. sqlite://taskdesk.db
        #[arg(long, short)]
        database: Option<String>,
    },
    /// Validate and print the effective configuration
    CheckConfig,
}

impl Cli {
    /// Settings given on the command line, applied over file and environment
    #[must_use]
    pub fn overrides(&self) -> PartialConfig {
        let mut layer = PartialConfig {
            log_format: self.log_format,
            ..PartialConfig::default()
        };
        match &self.command {
            Commands::Serve { bind, database } => {
                layer.bind_address.clone_from(bind);
                layer.database_url.clone_from(database);
            }
            Commands::Migrate { database } => {
                layer.database_url.clone_from(database);
            }
            Commands::CheckConfig => {}
        }
        layer
    }

    /// Whether the command needs the full server configuration to be valid
    #[must_use]
    pub fn requires_valid_config(&self) -> bool {
        !matches!(self.command, Commands::Migrate { .. })
    }
}

/// Connect to the database and serve requests until Ctrl-C
///
/// # Errors
///
/// Returns an error if the database cannot be opened or the address cannot be bound
pub async fn serve(config: &AppConfig) -> anyhow::Result<()> {
    let db = TaskDatabase::from_connection_string(&config.database_url).await?;
    let state = AppState::new(db, config);
    info!(
        "Storing attachments under {}",
        state.attachments.root().display()
    );
    let app = router(state);

    let listener = TcpListener::bind(&config.bind_address).await?;
    info!("taskdesk listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("taskdesk stopped");
    Ok(())
}

/// Open the database, applying the schema, and report its contents
///
/// # Errors
///
/// Returns an error if the database cannot be opened or migrated
pub async fn migrate(config: &AppConfig) -> anyhow::Result<()> {
    let db = TaskDatabase::from_connection_string(&config.database_url).await?;
    let stats = db.get_stats().await?;
    info!(
        "Schema ready at {}: {} users, {} tasks",
        config.database_url, stats.user_count, stats.task_count
    );
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Shutdown signal received");
}
