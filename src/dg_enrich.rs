//! Looks up Spotify track ids for scraped songs.

use anyhow::Result;
use clap::Parser;
use deathguild::cli::{init_tracing, log_startup, CommonArgs, SpotifyArgs};
use deathguild::config::CliConfig;
use deathguild::job_pool::JobPool;
use deathguild::pipeline::SongEnricher;
use deathguild::playlist_store::SqlitePlaylistStore;
use deathguild::spotify::SpotifyClient;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "dg-enrich")]
#[command(about = "Find Spotify tracks for songs in the database")]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    #[command(flatten)]
    spotify: SpotifyArgs,

    /// Searches in flight at the same time.
    #[arg(long, env = "CONCURRENCY", default_value_t = 5)]
    concurrency: usize,

    /// Stop after this many songs.
    #[arg(long, env = "MAX_SONGS")]
    max_songs: Option<usize>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing()?;
    log_startup("dg-enrich");

    let cli = CliConfig {
        max_songs: args.max_songs,
        ..args.spotify.apply(args.common.cli_config(args.concurrency))
    };
    let config = args.common.resolve(cli)?;

    info!("Opening SQLite database at {:?}...", config.database_path);
    let store = SqlitePlaylistStore::new(&config.database_path)?
        .with_recheck_policy(config.enrich.recheck);
    let service = SpotifyClient::new(config.require_spotify()?)?;
    let pool = JobPool::new(config.concurrency)?;

    let enricher = SongEnricher {
        store: &store,
        service: &service,
        pacing: config.pacing,
        batch_size: config.enrich.batch_size,
        max_songs: config.enrich.max_songs,
    };
    enricher.run(&pool)?;
    Ok(())
}
