//! The three pipeline stages: scrape, enrich and publish.
//!
//! Each stage is an explicit context struct holding the store, the external
//! service it talks to and its settings. A stage fans its per-item work out
//! through a [`JobPool`](crate::job_pool::JobPool); per-item failures stay
//! inside their job, and a round with any failure ends the stage with
//! [`PoolError::JobsFailed`](crate::job_pool::PoolError::JobsFailed).

mod enrich;
mod publish;
mod scrape;

pub use enrich::{search_query, trim_trailing_parenthetical, EnrichSummary, SongEnricher};
pub use publish::{
    all_time_collection, day_collection, year_collection, CollectionName, PlaylistPublisher,
    PublishOutcome, PublishSummary, ALL_TIME_SLUG,
};
pub use scrape::{PlaylistOutcome, PlaylistScraper, ScrapeSummary};

use crate::legacy_site::ScrapeError;
use crate::spotify::SpotifyError;
use thiserror::Error;

/// Why a single pipeline job failed.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Scrape(#[from] ScrapeError),

    #[error(transparent)]
    ExternalApi(#[from] SpotifyError),

    #[error("Persistence error: {0:#}")]
    Persistence(#[from] anyhow::Error),
}
