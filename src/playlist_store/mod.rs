//! Persistence for playlists, songs and the Spotify ids attached to them.
//!
//! All writes go through idempotent upserts keyed on natural identities: a
//! playlist's day, a song's (artist, title) pair and an aggregate playlist's
//! slug. Re-running any pipeline stage over the same input converges on the
//! same rows.

mod models;
mod schema;
mod sqlite_playlist_store;
mod stats;

pub use models::*;
pub use schema::PLAYLIST_VERSIONED_SCHEMAS;
pub use sqlite_playlist_store::SqlitePlaylistStore;

use anyhow::Result;
use chrono::NaiveDate;

pub trait PlaylistStore: Send + Sync {
    // Scraping
    /// Inserts the playlist for `day` if missing, every song if missing, and
    /// upserts each membership with the song's index in `songs` as position.
    /// All or nothing.
    fn upsert_playlist_and_songs(&self, day: NaiveDate, songs: &[NewSong]) -> Result<i64>;
    fn is_playlist_already_handled(&self, day: NaiveDate) -> Result<bool>;

    // Enrichment
    /// Songs without a Spotify id that were never searched, or whose last
    /// search is older than the recheck window plus a per-row jitter.
    /// Newest songs first.
    fn songs_needing_external_id(&self, batch_size: usize) -> Result<Vec<Song>>;
    fn update_song_external_id(&self, song: &Song) -> Result<()>;
    /// Writes a whole batch of lookups in one transaction.
    fn update_song_external_ids(&self, lookups: &[SongLookup]) -> Result<()>;

    // Publishing
    /// Playlists without a Spotify id, most recent day first, songs populated.
    fn playlists_needing_external_collection(&self, limit: usize) -> Result<Vec<Playlist>>;
    fn update_playlist_external_id(&self, playlist: &Playlist) -> Result<()>;
    fn update_aggregate_playlist_external_id(&self, slug: &str, spotify_id: &str) -> Result<()>;

    // Aggregation
    fn playlist_years(&self) -> Result<Vec<PlaylistYear>>;
    /// Ordered songs of a playlist with 1-based positions.
    fn playlist_songs(&self, playlist_id: i64) -> Result<Vec<Song>>;
    /// An empty `years` slice means every year.
    fn artist_rankings_by_plays(&self, years: &[i32], limit: usize) -> Result<Vec<ArtistRanking>>;
    fn artist_rankings_by_songs(&self, years: &[i32], limit: usize) -> Result<Vec<ArtistRanking>>;
    fn song_rankings(
        &self,
        years: &[i32],
        limit: usize,
        only_with_external_id: bool,
    ) -> Result<Vec<SongRanking>>;
    fn special_playlist_external_id(&self, slug: &str) -> Result<Option<String>>;
}
