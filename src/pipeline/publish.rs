//! Publishing of Spotify playlists for every day, every year and all time.

use super::PipelineError;
use crate::config::PublishSettings;
use crate::job_pool::{Job, JobPool};
use crate::pacing::RateLimitPacing;
use crate::playlist_store::{Playlist, PlaylistStore};
use crate::spotify::{
    SpotifyError, StreamingService, MAX_PLAYLISTS_PER_PAGE, MAX_TRACKS_PER_REQUEST,
};
use anyhow::Result;
use chrono::NaiveDate;
use std::collections::HashMap;
use tracing::{debug, info, warn};

pub const ALL_TIME_SLUG: &str = "all-time";

/// Deterministic name and description of a published playlist. The name is
/// how an existing playlist is found again on later runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionName {
    pub name: String,
    pub description: String,
}

pub fn day_collection(day: NaiveDate) -> CollectionName {
    CollectionName {
        name: format!("Death Guild Playlist - {}", day.format("%Y-%m-%d")),
        description: format!(
            "Songs played at Death Guild on {}.",
            day.format("%B %-d, %Y")
        ),
    }
}

pub fn year_collection(year: i32, size: usize) -> CollectionName {
    CollectionName {
        name: format!("Death Guild - Top Songs of {}", year),
        description: format!(
            "The {} most played songs at Death Guild in {}.",
            size, year
        ),
    }
}

pub fn all_time_collection(size: usize) -> CollectionName {
    CollectionName {
        name: "Death Guild - All-time Top Songs".to_string(),
        description: format!("The {} most played songs at Death Guild of all time.", size),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOutcome {
    pub spotify_id: String,
    /// False when a playlist with the same name already existed.
    pub created: bool,
    pub tracks: usize,
    /// Songs left out because of the per-request track limit.
    pub dropped: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishSummary {
    pub days: usize,
    pub aggregates: usize,
    pub created: usize,
    pub reused: usize,
}

impl PublishSummary {
    fn record(&mut self, outcome: &PublishOutcome) {
        if outcome.created {
            self.created += 1;
        } else {
            self.reused += 1;
        }
    }
}

/// Name to id of every playlist the account owns or follows.
type CollectionMap = HashMap<String, String>;

pub struct PlaylistPublisher<'a> {
    pub store: &'a dyn PlaylistStore,
    pub service: &'a dyn StreamingService,
    pub pacing: RateLimitPacing,
    pub settings: PublishSettings,
}

impl<'a> PlaylistPublisher<'a> {
    fn fetch_collection_map(&self) -> Result<CollectionMap, SpotifyError> {
        let mut map = CollectionMap::new();
        let mut offset = 0;
        loop {
            let page = self
                .service
                .list_playlists_page(MAX_PLAYLISTS_PER_PAGE, offset);
            self.pacing.pause();
            let page = page?;
            if page.items.is_empty() {
                break;
            }
            offset += page.items.len();
            for playlist in page.items {
                map.entry(playlist.name).or_insert(playlist.id);
            }
            if !page.has_next {
                break;
            }
        }
        info!("Cached {} playlist(s)", map.len());
        Ok(map)
    }

    /// Finds or creates the playlist called `target.name` and replaces its
    /// tracks with the first [`MAX_TRACKS_PER_REQUEST`] of `track_ids`.
    fn publish_collection(
        &self,
        user_id: &str,
        existing: &CollectionMap,
        target: &CollectionName,
        mut track_ids: Vec<String>,
    ) -> Result<PublishOutcome, SpotifyError> {
        let (spotify_id, created) = match existing.get(&target.name) {
            Some(id) => {
                debug!("Found cached playlist: \"{}\" (ID {})", target.name, id);
                (id.clone(), false)
            }
            None => {
                let created =
                    self.service
                        .create_playlist(user_id, &target.name, &target.description);
                self.pacing.pause();
                let created = created?;
                info!("Created playlist: \"{}\"", target.name);
                (created.id, true)
            }
        };

        let dropped = track_ids.len().saturating_sub(MAX_TRACKS_PER_REQUEST);
        if dropped > 0 {
            warn!(
                "Playlist \"{}\" has {} songs; dropping the last {} over the limit of {}",
                target.name,
                track_ids.len(),
                dropped,
                MAX_TRACKS_PER_REQUEST
            );
            track_ids.truncate(MAX_TRACKS_PER_REQUEST);
        }

        let replaced = self.service.replace_playlist_tracks(&spotify_id, &track_ids);
        self.pacing.pause();
        replaced?;

        info!(
            "Updated playlist: \"{}\" (ID {}) with {} song(s)",
            target.name,
            spotify_id,
            track_ids.len()
        );
        Ok(PublishOutcome {
            spotify_id,
            created,
            tracks: track_ids.len(),
            dropped,
        })
    }

    pub fn publish_day(
        &self,
        user_id: &str,
        existing: &CollectionMap,
        playlist: &Playlist,
    ) -> Result<PublishOutcome, PipelineError> {
        let track_ids: Vec<String> = playlist
            .songs
            .iter()
            .filter_map(|song| song.spotify_id.clone())
            .collect();

        let outcome = self.publish_collection(
            user_id,
            existing,
            &day_collection(playlist.day),
            track_ids,
        )?;

        self.store.update_playlist_external_id(&Playlist {
            spotify_id: Some(outcome.spotify_id.clone()),
            songs: Vec::new(),
            ..playlist.clone()
        })?;
        Ok(outcome)
    }

    /// Publishes the top songs of `years` (every year when empty) under `slug`.
    pub fn publish_aggregate(
        &self,
        user_id: &str,
        existing: &CollectionMap,
        slug: &str,
        target: &CollectionName,
        years: &[i32],
    ) -> Result<PublishOutcome, PipelineError> {
        let track_ids: Vec<String> = self
            .store
            .song_rankings(years, self.settings.aggregate_size, true)?
            .into_iter()
            .filter_map(|ranking| ranking.spotify_id)
            .collect();

        let outcome = self.publish_collection(user_id, existing, target, track_ids)?;
        self.store
            .update_aggregate_playlist_external_id(slug, &outcome.spotify_id)?;
        Ok(outcome)
    }

    fn publish_days(
        &self,
        pool: &JobPool,
        user_id: &str,
        existing: &CollectionMap,
        summary: &mut PublishSummary,
    ) -> Result<()> {
        loop {
            let playlists = self
                .store
                .playlists_needing_external_collection(self.settings.batch_size)?;
            if playlists.is_empty() {
                return Ok(());
            }
            info!("Found {} playlist(s) needing Spotify IDs", playlists.len());

            let jobs: Vec<Job<PublishOutcome, PipelineError>> = playlists
                .iter()
                .map(|playlist| {
                    Job::new(format!("playlist: {}", playlist.day), move || {
                        self.publish_day(user_id, existing, playlist)
                    })
                })
                .collect();
            let report = pool.run(jobs);

            summary.days += report.outputs.len();
            report.outputs.iter().for_each(|o| summary.record(o));

            report.log_errors();
            report.into_result()?;
        }
    }

    fn publish_aggregates(
        &self,
        pool: &JobPool,
        user_id: &str,
        existing: &CollectionMap,
        summary: &mut PublishSummary,
    ) -> Result<()> {
        let years: Vec<i32> = self
            .store
            .playlist_years()?
            .into_iter()
            .map(|y| y.year)
            .collect();
        if years.is_empty() {
            return Ok(());
        }

        let size = self.settings.aggregate_size;
        let mut targets: Vec<(String, CollectionName, Vec<i32>)> = years
            .iter()
            .map(|&year| (year.to_string(), year_collection(year, size), vec![year]))
            .collect();
        targets.push((ALL_TIME_SLUG.to_string(), all_time_collection(size), Vec::new()));

        let jobs: Vec<Job<PublishOutcome, PipelineError>> = targets
            .iter()
            .map(|(slug, target, years)| {
                Job::new(format!("aggregate: {}", slug), move || {
                    self.publish_aggregate(user_id, existing, slug, target, years)
                })
            })
            .collect();
        let report = pool.run(jobs);

        summary.aggregates += report.outputs.len();
        report.outputs.iter().for_each(|o| summary.record(o));

        report.log_errors();
        report.into_result()?;
        Ok(())
    }

    /// Publishes every unpublished day, then refreshes the year and all-time
    /// playlists.
    pub fn run(&self, pool: &JobPool) -> Result<PublishSummary> {
        let mut summary = PublishSummary::default();

        let pending = self.store.playlists_needing_external_collection(1)?;
        if pending.is_empty() && !self.settings.aggregates_enabled {
            info!("No playlists need publishing");
            return Ok(summary);
        }

        let user_id = self.service.current_user_id();
        self.pacing.pause();
        let user_id = user_id?;
        let existing = self.fetch_collection_map()?;

        self.publish_days(pool, &user_id, &existing, &mut summary)?;
        if self.settings.aggregates_enabled {
            self.publish_aggregates(pool, &user_id, &existing, &mut summary)?;
        }

        info!(
            "Finished publishing: {} day(s), {} aggregate(s), {} created, {} reused",
            summary.days, summary.aggregates, summary.created, summary.reused
        );
        Ok(summary)
    }
}
