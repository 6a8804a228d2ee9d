use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

/// A song as scraped from a playlist page, before it has a row of its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSong {
    pub artist: String,
    pub title: String,
}

impl NewSong {
    pub fn new(artist: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            artist: artist.into(),
            title: title.into(),
        }
    }
}

/// A stored song. Identity is the (artist, title) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Song {
    pub id: i64,
    pub artist: String,
    pub title: String,
    /// Spotify track id, once enrichment found one.
    pub spotify_id: Option<String>,
    /// When enrichment last searched for this song.
    pub spotify_checked_at: Option<DateTime<Utc>>,
    /// 1-based position, only set when read through a playlist.
    pub position: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Playlist {
    pub id: i64,
    pub day: NaiveDate,
    /// Spotify playlist id, once published.
    pub spotify_id: Option<String>,
    /// Songs in position order. Empty unless the query populates them.
    pub songs: Vec<Song>,
}

/// Outcome of one enrichment search, ready to be written back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongLookup {
    pub song_id: i64,
    pub spotify_id: Option<String>,
    pub checked_at: DateTime<Utc>,
}

impl From<&Song> for SongLookup {
    fn from(song: &Song) -> Self {
        Self {
            song_id: song.id,
            spotify_id: song.spotify_id.clone(),
            checked_at: song.spotify_checked_at.unwrap_or_else(Utc::now),
        }
    }
}

/// Published playlists of one calendar year, most recent day first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaylistYear {
    pub year: i32,
    pub playlists: Vec<Playlist>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtistRanking {
    pub artist: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SongRanking {
    pub artist: String,
    pub title: String,
    pub spotify_id: Option<String>,
    pub count: i64,
}

/// How long a song that was searched without success waits before being
/// searched again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecheckPolicy {
    pub window: chrono::Duration,
    /// Upper bound of the random extra delay added per song.
    pub max_jitter: chrono::Duration,
}

impl Default for RecheckPolicy {
    fn default() -> Self {
        Self {
            window: chrono::Duration::days(30),
            max_jitter: chrono::Duration::days(7),
        }
    }
}
