//! Scrapes the Death Guild playlist archive into the local database.

use anyhow::Result;
use clap::Parser;
use deathguild::cli::{init_tracing, log_startup, CommonArgs};
use deathguild::job_pool::JobPool;
use deathguild::legacy_site::LegacySiteClient;
use deathguild::pipeline::PlaylistScraper;
use deathguild::playlist_store::SqlitePlaylistStore;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "dg-scrape")]
#[command(about = "Scrape Death Guild playlists into the database")]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    /// Playlist pages fetched at the same time.
    #[arg(long, env = "CONCURRENCY", default_value_t = 2)]
    concurrency: usize,

    /// Base URL of the playlist archive.
    #[arg(long, env = "DEATHGUILD_BASE_URL")]
    base_url: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing()?;
    log_startup("dg-scrape");

    let cli = deathguild::config::CliConfig {
        base_url: args.base_url.clone(),
        ..args.common.cli_config(args.concurrency)
    };
    let config = args.common.resolve(cli)?;

    info!("Opening SQLite database at {:?}...", config.database_path);
    let store = SqlitePlaylistStore::new(&config.database_path)?;
    let source = LegacySiteClient::new(&config.base_url)?;
    let pool = JobPool::new(config.concurrency)?;

    let scraper = PlaylistScraper {
        store: &store,
        source: &source,
        pacing: config.pacing,
    };
    scraper.run(&pool)?;
    Ok(())
}
