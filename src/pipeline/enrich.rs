//! Song enrichment: resolve (artist, title) pairs to Spotify track ids.
//!
//! ## Per song
//!
//! ```text
//! search "artist:A T" ──found──► record id
//!        │
//!        └─none─► T ends in "(...)"? ──yes──► search "artist:A T'" ─► record id or none
//!                        │
//!                        └─no──► record none
//! ```
//!
//! Every search is followed by a jittered pause, and a song's checked-at
//! timestamp is written whether or not anything was found so that it is not
//! searched again until the recheck window has passed.

use super::PipelineError;
use crate::job_pool::{Job, JobPool, PoolError};
use crate::pacing::RateLimitPacing;
use crate::playlist_store::{PlaylistStore, Song, SongLookup};
use crate::spotify::{SpotifyError, StreamingService, TrackMatch};
use anyhow::Result;
use chrono::Utc;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use tracing::{debug, info};

lazy_static! {
    static ref TRAILING_PARENTHETICALS: Regex =
        Regex::new(r"\s*(?:\([^()]*\)\s*)+$").expect("Invalid trailing parenthetical regex");
}

/// Removes the run of parenthetical groups ending the title, along with the
/// whitespace before it. `"Song (Remix) (Edit)"` becomes `"Song"`; a title
/// whose parenthetical is followed by more text is left alone.
pub fn trim_trailing_parenthetical(title: &str) -> &str {
    match TRAILING_PARENTHETICALS.find(title) {
        Some(m) => &title[..m.start()],
        None => title,
    }
}

pub fn search_query(artist: &str, title: &str) -> String {
    format!("artist:{} {}", artist, title)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichSummary {
    pub processed: usize,
    pub found: usize,
    pub not_found: usize,
    pub batches: usize,
}

pub struct SongEnricher<'a> {
    pub store: &'a dyn PlaylistStore,
    pub service: &'a dyn StreamingService,
    pub pacing: RateLimitPacing,
    pub batch_size: usize,
    /// Stop once this many songs were processed in one run.
    pub max_songs: Option<usize>,
}

impl<'a> SongEnricher<'a> {
    fn search(&self, query: &str) -> Result<Option<TrackMatch>, SpotifyError> {
        debug!("Searching Spotify for: {}", query);
        let result = self.service.search_track(query);
        self.pacing.pause();
        result
    }

    /// Looks one song up, falling back to the title without its trailing
    /// parentheticals when the full title finds nothing.
    pub fn enrich_song(&self, song: &Song) -> Result<SongLookup, PipelineError> {
        let mut found = self.search(&search_query(&song.artist, &song.title))?;

        if found.is_none() {
            let trimmed = trim_trailing_parenthetical(&song.title);
            if !trimmed.is_empty() && trimmed != song.title {
                debug!(
                    "No match for '{}'; retrying as '{}'",
                    song.title, trimmed
                );
                found = self.search(&search_query(&song.artist, trimmed))?;
            }
        }

        match &found {
            Some(track) => debug!(
                "Found {} for {} - {}",
                track.id, song.artist, song.title
            ),
            None => debug!("No Spotify match for {} - {}", song.artist, song.title),
        }

        Ok(SongLookup {
            song_id: song.id,
            spotify_id: found.map(|track| track.id),
            checked_at: Utc::now(),
        })
    }

    fn next_batch_limit(&self, processed: usize) -> usize {
        match self.max_songs {
            Some(max) => self.batch_size.min(max.saturating_sub(processed)),
            None => self.batch_size,
        }
    }

    /// Enriches batches of songs until none are left, the song cap is
    /// reached, or a batch has a failed lookup.
    ///
    /// Successful lookups of a batch are committed even when other songs in
    /// the same batch failed.
    pub fn run(&self, pool: &JobPool) -> Result<EnrichSummary> {
        let mut summary = EnrichSummary::default();
        let mut seen: HashSet<i64> = HashSet::new();

        loop {
            let limit = self.next_batch_limit(summary.processed);
            if limit == 0 {
                info!("Reached the limit of {} song(s) for this run", summary.processed);
                break;
            }

            let songs: Vec<Song> = self
                .store
                .songs_needing_external_id(limit)?
                .into_iter()
                .filter(|song| seen.insert(song.id))
                .collect();
            if songs.is_empty() {
                break;
            }

            let jobs: Vec<Job<SongLookup, PipelineError>> = songs
                .iter()
                .map(|song| {
                    Job::new(
                        format!("song: {} - {}", song.artist, song.title),
                        move || self.enrich_song(song),
                    )
                })
                .collect();
            let report = pool.run(jobs);

            self.store.update_song_external_ids(&report.outputs)?;

            let found = report
                .outputs
                .iter()
                .filter(|lookup| lookup.spotify_id.is_some())
                .count();
            summary.batches += 1;
            summary.processed += report.outputs.len();
            summary.found += found;
            summary.not_found += report.outputs.len() - found;
            info!(
                "Batch {}: {} found, {} not found, {} errors",
                summary.batches,
                found,
                report.outputs.len() - found,
                report.failed
            );

            if !report.is_success() {
                report.log_errors();
                return Err(PoolError::JobsFailed {
                    failed: report.failed,
                }
                .into());
            }
        }

        info!(
            "Enrichment complete: {} song(s) processed, {} found, {} not found",
            summary.processed, summary.found, summary.not_found
        );
        Ok(summary)
    }
}
