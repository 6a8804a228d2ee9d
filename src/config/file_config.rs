use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub database_url: Option<String>,
    pub concurrency: Option<usize>,
    pub base_url: Option<String>,

    // Feature configs
    pub spotify: Option<SpotifyConfig>,
    pub pacing: Option<PacingConfig>,
    pub enrich: Option<EnrichConfig>,
    pub publish: Option<PublishConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct SpotifyConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct PacingConfig {
    pub min_ms: Option<u64>,
    pub max_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct EnrichConfig {
    pub batch_size: Option<usize>,
    pub max_songs: Option<usize>,
    pub recheck_window_days: Option<i64>,
    pub recheck_jitter_days: Option<i64>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct PublishConfig {
    pub batch_size: Option<usize>,
    pub aggregate_size: Option<usize>,
    pub aggregates_enabled: Option<bool>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
