mod file_config;

pub use file_config::{EnrichConfig, FileConfig, PacingConfig, PublishConfig, SpotifyConfig};

use crate::legacy_site::DEFAULT_BASE_URL;
use crate::pacing::RateLimitPacing;
use crate::playlist_store::RecheckPolicy;
use crate::spotify::SpotifyCredentials;
use anyhow::{bail, Result};
use std::path::PathBuf;
use std::time::Duration;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub database_url: Option<String>,
    pub concurrency: usize,
    pub base_url: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub refresh_token: Option<String>,
    pub max_songs: Option<usize>,
    pub skip_aggregates: bool,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Core settings
    pub database_path: PathBuf,
    pub concurrency: usize,
    pub base_url: String,
    pub spotify: Option<SpotifyCredentials>,

    // Stage settings (with defaults)
    pub pacing: RateLimitPacing,
    pub enrich: EnrichSettings,
    pub publish: PublishSettings,
}

#[derive(Debug, Clone)]
pub struct EnrichSettings {
    pub batch_size: usize,
    /// Stop after this many songs in one run.
    pub max_songs: Option<usize>,
    pub recheck: RecheckPolicy,
}

impl Default for EnrichSettings {
    fn default() -> Self {
        Self {
            batch_size: 20,
            max_songs: None,
            recheck: RecheckPolicy::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PublishSettings {
    /// Day playlists selected per round.
    pub batch_size: usize,
    /// Songs in each year and all-time playlist.
    pub aggregate_size: usize,
    pub aggregates_enabled: bool,
}

impl Default for PublishSettings {
    fn default() -> Self {
        Self {
            batch_size: 100,
            aggregate_size: 100,
            aggregates_enabled: true,
        }
    }
}

/// Accepts a bare path or a `sqlite://` URL.
pub fn parse_database_url(url: &str) -> PathBuf {
    let path = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
        .unwrap_or(url);
    PathBuf::from(path)
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let database_url = file
            .database_url
            .or_else(|| cli.database_url.clone())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "database_url must be specified via --database-url, DATABASE_URL or in config file"
                )
            })?;
        let database_path = parse_database_url(&database_url);
        if database_path.as_os_str().is_empty() {
            bail!("database_url does not name a file: {:?}", database_url);
        }

        let concurrency = file.concurrency.unwrap_or(cli.concurrency);
        if concurrency == 0 {
            bail!("concurrency must be at least 1");
        }

        let base_url = file
            .base_url
            .or_else(|| cli.base_url.clone())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        // Spotify credentials are all-or-nothing
        let spotify_file = file.spotify.unwrap_or_default();
        let client_id = spotify_file.client_id.or_else(|| cli.client_id.clone());
        let client_secret = spotify_file
            .client_secret
            .or_else(|| cli.client_secret.clone());
        let refresh_token = spotify_file
            .refresh_token
            .or_else(|| cli.refresh_token.clone());
        let spotify = match (client_id, client_secret, refresh_token) {
            (Some(client_id), Some(client_secret), Some(refresh_token)) => {
                Some(SpotifyCredentials {
                    client_id,
                    client_secret,
                    refresh_token,
                })
            }
            (None, None, None) => None,
            _ => bail!("CLIENT_ID, CLIENT_SECRET and REFRESH_TOKEN must be provided together"),
        };

        let pacing_file = file.pacing.unwrap_or_default();
        let default_pacing = RateLimitPacing::default();
        let pacing = RateLimitPacing::new(
            pacing_file
                .min_ms
                .map(Duration::from_millis)
                .unwrap_or(default_pacing.min),
            pacing_file
                .max_ms
                .map(Duration::from_millis)
                .unwrap_or(default_pacing.max),
        );
        if pacing.min > pacing.max {
            bail!(
                "pacing min ({:?}) must not exceed pacing max ({:?})",
                pacing.min,
                pacing.max
            );
        }

        let enrich_file = file.enrich.unwrap_or_default();
        let enrich_defaults = EnrichSettings::default();
        let enrich = EnrichSettings {
            batch_size: enrich_file.batch_size.unwrap_or(enrich_defaults.batch_size),
            max_songs: enrich_file.max_songs.or(cli.max_songs),
            recheck: RecheckPolicy {
                window: enrich_file
                    .recheck_window_days
                    .map(chrono::Duration::days)
                    .unwrap_or(enrich_defaults.recheck.window),
                max_jitter: enrich_file
                    .recheck_jitter_days
                    .map(chrono::Duration::days)
                    .unwrap_or(enrich_defaults.recheck.max_jitter),
            },
        };
        if enrich.batch_size == 0 {
            bail!("enrich batch_size must be at least 1");
        }
        // A song checked during a run must not qualify again in the same run
        if enrich.recheck.window < chrono::Duration::days(1) {
            bail!("recheck window must be at least 1 day");
        }
        if enrich.recheck.max_jitter < chrono::Duration::zero() {
            bail!("recheck jitter must not be negative");
        }

        let publish_file = file.publish.unwrap_or_default();
        let publish_defaults = PublishSettings::default();
        let publish = PublishSettings {
            batch_size: publish_file
                .batch_size
                .unwrap_or(publish_defaults.batch_size),
            aggregate_size: publish_file
                .aggregate_size
                .unwrap_or(publish_defaults.aggregate_size),
            aggregates_enabled: publish_file
                .aggregates_enabled
                .unwrap_or(!cli.skip_aggregates),
        };
        if publish.batch_size == 0 {
            bail!("publish batch_size must be at least 1");
        }

        Ok(Self {
            database_path,
            concurrency,
            base_url,
            spotify,
            pacing,
            enrich,
            publish,
        })
    }

    /// Spotify credentials, for stages that cannot run without them.
    pub fn require_spotify(&self) -> Result<SpotifyCredentials> {
        self.spotify.clone().ok_or_else(|| {
            anyhow::anyhow!("CLIENT_ID, CLIENT_SECRET and REFRESH_TOKEN are required")
        })
    }
}
