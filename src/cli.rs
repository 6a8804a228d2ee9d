//! Arguments and start-up shared by the `dg-*` executables.

use crate::config::{AppConfig, CliConfig, FileConfig};
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// SQLite database, as a path or a `sqlite://` URL.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Path to a TOML config file. Values in it override the command line.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct SpotifyArgs {
    #[arg(long, env = "CLIENT_ID")]
    pub client_id: Option<String>,

    #[arg(long, env = "CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    #[arg(long, env = "REFRESH_TOKEN", hide_env_values = true)]
    pub refresh_token: Option<String>,
}

impl CommonArgs {
    pub fn cli_config(&self, concurrency: usize) -> CliConfig {
        CliConfig {
            database_url: self.database_url.clone(),
            concurrency,
            ..Default::default()
        }
    }

    /// Loads the config file, if any, and resolves it against `cli`.
    pub fn resolve(&self, cli: CliConfig) -> Result<AppConfig> {
        let file_config = match &self.config {
            Some(path) => {
                info!("Loading config from {:?}", path);
                Some(FileConfig::load(path)?)
            }
            None => None,
        };
        AppConfig::resolve(&cli, file_config)
    }
}

impl SpotifyArgs {
    pub fn apply(&self, cli: CliConfig) -> CliConfig {
        CliConfig {
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            refresh_token: self.refresh_token.clone(),
            ..cli
        }
    }
}

/// Logs to stderr, filtered by `LOG_LEVEL` (default `info`).
pub fn init_tracing() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")
}

pub fn log_startup(name: &str) {
    info!(
        "{} v{} ({})",
        name,
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH")
    );
}
