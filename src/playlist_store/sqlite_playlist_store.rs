use super::models::{
    ArtistRanking, NewSong, Playlist, PlaylistYear, RecheckPolicy, Song, SongLookup, SongRanking,
};
use super::schema::PLAYLIST_VERSIONED_SCHEMAS;
use super::{stats, PlaylistStore};
use crate::sqlite_persistence::initialize_schema;
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

pub(super) const DAY_FORMAT: &str = "%Y-%m-%d";

pub struct SqlitePlaylistStore {
    conn: Arc<Mutex<Connection>>,
    recheck_policy: RecheckPolicy,
}

impl SqlitePlaylistStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let path = db_path.as_ref();
        info!("Opening playlist database at {:?}", path);
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open playlist database {:?}", path))?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(mut conn: Connection) -> Result<Self> {
        conn.execute("PRAGMA foreign_keys = ON;", [])?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        initialize_schema(&mut conn, PLAYLIST_VERSIONED_SCHEMAS, "playlist")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            recheck_policy: RecheckPolicy::default(),
        })
    }

    pub fn with_recheck_policy(mut self, recheck_policy: RecheckPolicy) -> Self {
        self.recheck_policy = recheck_policy;
        self
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` inside `BEGIN IMMEDIATE`, committing on success and rolling
    /// back on error.
    fn write_transaction<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.lock();
        conn.execute("BEGIN IMMEDIATE", [])?;
        match f(&conn) {
            Ok(value) => {
                conn.execute("COMMIT", [])?;
                Ok(value)
            }
            Err(e) => {
                let _ = conn.execute("ROLLBACK", []);
                Err(e)
            }
        }
    }
}

pub(super) fn parse_day(idx: usize, raw: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, DAY_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn timestamp_to_datetime(ts: Option<i64>) -> Option<DateTime<Utc>> {
    ts.and_then(|ts| DateTime::from_timestamp(ts, 0))
}

/// Maps `id, artist, title, spotify_id, spotify_checked_at` and, when
/// `with_position`, a trailing 0-based `position`.
pub(super) fn row_to_song(row: &rusqlite::Row, with_position: bool) -> rusqlite::Result<Song> {
    let position = if with_position {
        Some(row.get::<_, i64>(5)? as usize + 1)
    } else {
        None
    };
    Ok(Song {
        id: row.get(0)?,
        artist: row.get(1)?,
        title: row.get(2)?,
        spotify_id: row.get(3)?,
        spotify_checked_at: timestamp_to_datetime(row.get(4)?),
        position,
    })
}

pub(super) fn load_playlist_songs(conn: &Connection, playlist_id: i64) -> Result<Vec<Song>> {
    let mut stmt = conn.prepare_cached(
        "SELECT s.id, s.artist, s.title, s.spotify_id, s.spotify_checked_at, ps.position
         FROM playlists_songs ps
            INNER JOIN songs s ON s.id = ps.songs_id
         WHERE ps.playlists_id = ?1
         ORDER BY ps.position",
    )?;
    let songs = stmt
        .query_map(params![playlist_id], |row| row_to_song(row, true))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(songs)
}

fn write_lookup(conn: &Connection, lookup: &SongLookup) -> Result<()> {
    conn.execute(
        "UPDATE songs SET spotify_id = ?1, spotify_checked_at = ?2 WHERE id = ?3",
        params![lookup.spotify_id, lookup.checked_at.timestamp(), lookup.song_id],
    )?;
    Ok(())
}

impl PlaylistStore for SqlitePlaylistStore {
    fn upsert_playlist_and_songs(&self, day: NaiveDate, songs: &[NewSong]) -> Result<i64> {
        let day_str = day.format(DAY_FORMAT).to_string();
        self.write_transaction(|conn| {
            // The no-op update makes RETURNING yield the existing id on conflict
            let playlist_id: i64 = conn.query_row(
                "INSERT INTO playlists (day) VALUES (?1)
                 ON CONFLICT (day) DO UPDATE SET day = excluded.day
                 RETURNING id",
                params![day_str],
                |row| row.get(0),
            )?;

            let mut song_stmt = conn.prepare_cached(
                "INSERT INTO songs (artist, title) VALUES (?1, ?2)
                 ON CONFLICT (artist, title) DO UPDATE SET artist = excluded.artist
                 RETURNING id",
            )?;
            let mut membership_stmt = conn.prepare_cached(
                "INSERT INTO playlists_songs (playlists_id, songs_id, position)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT (playlists_id, songs_id) DO UPDATE SET position = excluded.position",
            )?;

            for (position, song) in songs.iter().enumerate() {
                let song_id: i64 =
                    song_stmt.query_row(params![song.artist, song.title], |row| row.get(0))?;
                membership_stmt.execute(params![playlist_id, song_id, position as i64])?;
            }

            debug!(
                "Upserted playlist {} ({}) with {} songs",
                day_str,
                playlist_id,
                songs.len()
            );
            Ok(playlist_id)
        })
    }

    fn is_playlist_already_handled(&self, day: NaiveDate) -> Result<bool> {
        let conn = self.lock();
        let found = conn
            .query_row(
                "SELECT 1 FROM playlists WHERE day = ?1",
                params![day.format(DAY_FORMAT).to_string()],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn songs_needing_external_id(&self, batch_size: usize) -> Result<Vec<Song>> {
        let now = Utc::now().timestamp();
        let window = self.recheck_policy.window.num_seconds();
        let jitter_span = self.recheck_policy.max_jitter.num_seconds().max(0) + 1;

        let conn = self.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT id, artist, title, spotify_id, spotify_checked_at
             FROM songs
             WHERE spotify_id IS NULL
                AND (
                    spotify_checked_at IS NULL
                    OR spotify_checked_at < ?1 - ?2 - ((random() % ?3) + ?3) % ?3
                )
             ORDER BY id DESC
             LIMIT ?4",
        )?;
        let songs = stmt
            .query_map(
                params![now, window, jitter_span, batch_size as i64],
                |row| row_to_song(row, false),
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(songs)
    }

    fn update_song_external_id(&self, song: &Song) -> Result<()> {
        let conn = self.lock();
        write_lookup(&conn, &SongLookup::from(song))
    }

    fn update_song_external_ids(&self, lookups: &[SongLookup]) -> Result<()> {
        if lookups.is_empty() {
            return Ok(());
        }
        self.write_transaction(|conn| {
            for lookup in lookups {
                write_lookup(conn, lookup)?;
            }
            Ok(())
        })
    }

    fn playlists_needing_external_collection(&self, limit: usize) -> Result<Vec<Playlist>> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT id, day, spotify_id
             FROM playlists
             WHERE spotify_id IS NULL
             ORDER BY day DESC
             LIMIT ?1",
        )?;
        let mut playlists = stmt
            .query_map(params![limit as i64], |row| {
                Ok(Playlist {
                    id: row.get(0)?,
                    day: parse_day(1, &row.get::<_, String>(1)?)?,
                    spotify_id: row.get(2)?,
                    songs: Vec::new(),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        for playlist in &mut playlists {
            playlist.songs = load_playlist_songs(&conn, playlist.id)?;
        }
        Ok(playlists)
    }

    fn update_playlist_external_id(&self, playlist: &Playlist) -> Result<()> {
        let conn = self.lock();
        conn.execute(
            "UPDATE playlists SET spotify_id = ?1 WHERE id = ?2",
            params![playlist.spotify_id, playlist.id],
        )?;
        Ok(())
    }

    fn update_aggregate_playlist_external_id(&self, slug: &str, spotify_id: &str) -> Result<()> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO special_playlists (slug, spotify_id) VALUES (?1, ?2)
             ON CONFLICT (slug) DO UPDATE SET spotify_id = excluded.spotify_id",
            params![slug, spotify_id],
        )?;
        Ok(())
    }

    fn playlist_years(&self) -> Result<Vec<PlaylistYear>> {
        stats::playlist_years(&self.lock())
    }

    fn playlist_songs(&self, playlist_id: i64) -> Result<Vec<Song>> {
        load_playlist_songs(&self.lock(), playlist_id)
    }

    fn artist_rankings_by_plays(&self, years: &[i32], limit: usize) -> Result<Vec<ArtistRanking>> {
        stats::artist_rankings(&self.lock(), years, limit, stats::ArtistRankingBy::Plays)
    }

    fn artist_rankings_by_songs(&self, years: &[i32], limit: usize) -> Result<Vec<ArtistRanking>> {
        stats::artist_rankings(&self.lock(), years, limit, stats::ArtistRankingBy::Songs)
    }

    fn song_rankings(
        &self,
        years: &[i32],
        limit: usize,
        only_with_external_id: bool,
    ) -> Result<Vec<SongRanking>> {
        stats::song_rankings(&self.lock(), years, limit, only_with_external_id)
    }

    fn special_playlist_external_id(&self, slug: &str) -> Result<Option<String>> {
        let conn = self.lock();
        let spotify_id = conn
            .query_row(
                "SELECT spotify_id FROM special_playlists WHERE slug = ?1",
                params![slug],
                |row| row.get(0),
            )
            .optional()?;
        Ok(spotify_id)
    }
}
