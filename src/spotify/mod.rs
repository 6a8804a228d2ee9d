//! Spotify Web API access.
//!
//! The pipeline only talks to Spotify through [`StreamingService`], so tests
//! can substitute an in-memory fake for [`SpotifyClient`].

mod client;
mod models;

pub use client::{SpotifyClient, SpotifyCredentials};

use thiserror::Error;

/// Most track URIs a single "replace playlist items" call accepts.
pub const MAX_TRACKS_PER_REQUEST: usize = 100;

/// Largest page the "current user's playlists" endpoint returns.
pub const MAX_PLAYLISTS_PER_PAGE: usize = 50;

#[derive(Debug, Error)]
pub enum SpotifyError {
    #[error("Spotify request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Spotify returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Spotify rate limit hit (retry after {retry_after:?} s)")]
    RateLimited { retry_after: Option<u64> },

    #[error("Spotify authentication failed: {0}")]
    Auth(String),

    #[error("Failed to decode Spotify response: {0}")]
    Decode(String),

    #[error("Invalid Spotify request: {0}")]
    InvalidRequest(String),
}

/// First result of a track search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackMatch {
    pub id: String,
    pub name: String,
    pub artists: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistSummary {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistPage {
    pub items: Vec<PlaylistSummary>,
    pub total: usize,
    pub has_next: bool,
}

pub trait StreamingService: Send + Sync {
    fn search_track(&self, query: &str) -> Result<Option<TrackMatch>, SpotifyError>;

    fn current_user_id(&self) -> Result<String, SpotifyError>;

    /// One page of the current user's playlists. `limit` is capped at
    /// [`MAX_PLAYLISTS_PER_PAGE`].
    fn list_playlists_page(&self, limit: usize, offset: usize)
        -> Result<PlaylistPage, SpotifyError>;

    fn create_playlist(
        &self,
        user_id: &str,
        name: &str,
        description: &str,
    ) -> Result<PlaylistSummary, SpotifyError>;

    /// Replaces the whole membership of a playlist. At most
    /// [`MAX_TRACKS_PER_REQUEST`] ids.
    fn replace_playlist_tracks(
        &self,
        playlist_id: &str,
        track_ids: &[String],
    ) -> Result<(), SpotifyError>;
}
