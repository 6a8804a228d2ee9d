//! Death Guild playlist pipeline.
//!
//! Scrapes the club's playlist archive, matches the songs to Spotify tracks
//! and publishes them as Spotify playlists. The `dg-*` binaries each run one
//! stage; this library exposes the stages for testing and reuse.

pub mod cli;
pub mod config;
pub mod job_pool;
pub mod legacy_site;
pub mod pacing;
pub mod pipeline;
pub mod playlist_store;
pub mod spotify;
pub mod sqlite_persistence;

pub use playlist_store::{PlaylistStore, SqlitePlaylistStore};
pub use spotify::{SpotifyClient, StreamingService};
