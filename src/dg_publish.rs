//! Publishes day, year and all-time playlists to Spotify.

use anyhow::Result;
use clap::Parser;
use deathguild::cli::{init_tracing, log_startup, CommonArgs, SpotifyArgs};
use deathguild::config::CliConfig;
use deathguild::job_pool::JobPool;
use deathguild::pipeline::PlaylistPublisher;
use deathguild::playlist_store::SqlitePlaylistStore;
use deathguild::spotify::SpotifyClient;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "dg-publish")]
#[command(about = "Create or update Spotify playlists from the database")]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    #[command(flatten)]
    spotify: SpotifyArgs,

    /// Playlists published at the same time.
    #[arg(long, env = "CONCURRENCY", default_value_t = 5)]
    concurrency: usize,

    /// Only publish day playlists.
    #[arg(long, default_value_t = false)]
    skip_aggregates: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing()?;
    log_startup("dg-publish");

    let cli = CliConfig {
        skip_aggregates: args.skip_aggregates,
        ..args.spotify.apply(args.common.cli_config(args.concurrency))
    };
    let config = args.common.resolve(cli)?;

    info!("Opening SQLite database at {:?}...", config.database_path);
    let store = SqlitePlaylistStore::new(&config.database_path)?;
    let service = SpotifyClient::new(config.require_spotify()?)?;
    let pool = JobPool::new(config.concurrency)?;

    let publisher = PlaylistPublisher {
        store: &store,
        service: &service,
        pacing: config.pacing,
        settings: config.publish,
    };
    publisher.run(&pool)?;
    Ok(())
}
