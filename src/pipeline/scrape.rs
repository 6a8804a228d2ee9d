use super::PipelineError;
use crate::job_pool::{Job, JobPool};
use crate::legacy_site::{extract_day, scrape_index, scrape_playlist, PlaylistLink, PlaylistSource};
use crate::pacing::RateLimitPacing;
use crate::playlist_store::PlaylistStore;
use anyhow::Result;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaylistOutcome {
    /// The day was already in the store; nothing was fetched.
    AlreadyHandled,
    Inserted { songs: usize },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapeSummary {
    pub links: usize,
    pub inserted: usize,
    pub already_handled: usize,
    pub songs: usize,
}

pub struct PlaylistScraper<'a> {
    pub store: &'a dyn PlaylistStore,
    pub source: &'a dyn PlaylistSource,
    pub pacing: RateLimitPacing,
}

impl<'a> PlaylistScraper<'a> {
    /// Fetches, scrapes and stores one day's playlist unless it is already
    /// stored. Nothing is written for a page that fails to scrape.
    pub fn handle_playlist(&self, link: &PlaylistLink) -> Result<PlaylistOutcome, PipelineError> {
        let day = extract_day(link)?;
        if self.store.is_playlist_already_handled(day)? {
            debug!("Playlist {} already handled; skipping", day);
            return Ok(PlaylistOutcome::AlreadyHandled);
        }

        let document = self.source.fetch_playlist(link);
        self.pacing.pause();
        let songs = scrape_playlist(&document?)?;

        self.store.upsert_playlist_and_songs(day, &songs)?;
        info!("Inserted records for {} song(s) on {}", songs.len(), day);
        Ok(PlaylistOutcome::Inserted { songs: songs.len() })
    }

    /// Scrapes every playlist linked from the index.
    pub fn run(&self, pool: &JobPool) -> Result<ScrapeSummary> {
        let links = scrape_index(&self.source.fetch_index()?)?;

        let jobs: Vec<Job<PlaylistOutcome, PipelineError>> = links
            .iter()
            .map(|link| Job::new(format!("playlist: {}", link), move || self.handle_playlist(link)))
            .collect();

        info!(
            "Scraping {} playlist(s) with concurrency {}",
            jobs.len(),
            pool.concurrency()
        );
        let report = pool.run(jobs);

        let mut summary = ScrapeSummary {
            links: links.len(),
            ..Default::default()
        };
        for outcome in &report.outputs {
            match outcome {
                PlaylistOutcome::AlreadyHandled => summary.already_handled += 1,
                PlaylistOutcome::Inserted { songs } => {
                    summary.inserted += 1;
                    summary.songs += songs;
                }
            }
        }

        report.log_errors();
        report.log_slowest(3);
        info!(
            "Scraped {} new playlist(s) with {} song(s); {} already handled",
            summary.inserted, summary.songs, summary.already_handled
        );
        report.into_result()?;
        Ok(summary)
    }
}
