//! Playlist pages and databases for tests

use deathguild::playlist_store::{NewSong, PlaylistStore, SongLookup, SqlitePlaylistStore};
use chrono::{NaiveDate, Utc};
use std::path::PathBuf;
use tempfile::TempDir;

pub fn link_for(day: &str) -> String {
    format!("/playlist/{}", day)
}

pub fn index_page(days: &[&str]) -> String {
    let rows: String = days
        .iter()
        .map(|day| format!("<tr><td><a href=\"{}\">{}</a></td></tr>\n", link_for(day), day))
        .collect();
    format!(
        "<html><body><div id=\"playlist\"><table>\n{}</table></div></body></html>",
        rows
    )
}

/// An "old style" page: one table row per song under an Artist/Title header.
pub fn table_page(songs: &[(&str, &str)]) -> String {
    let rows: String = songs
        .iter()
        .map(|(artist, title)| {
            format!(
                "<tr><td>{}</td><td>{}</td></tr>\n",
                escape(artist),
                escape(title)
            )
        })
        .collect();
    format!(
        "<html><body><table class=\"Normal\">\n<tr><td>Artist</td><td>Title</td></tr>\n{}</table></body></html>",
        rows
    )
}

/// A "new style" page: `<em>artist</em> - title<br>` lines.
pub fn inline_page(songs: &[(&str, &str)]) -> String {
    let lines: String = songs
        .iter()
        .map(|(artist, title)| format!("<em>{}</em> - {}<br>\n", escape(artist), escape(title)))
        .collect();
    format!(
        "<html><body><div id=\"playlist\"><p>\n{}</p></div></body></html>",
        lines
    )
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// A store backed by a file in a temporary directory.
pub struct TestDb {
    pub store: SqlitePlaylistStore,
    pub path: PathBuf,
    _dir: TempDir,
}

impl TestDb {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("deathguild.db");
        let store = SqlitePlaylistStore::new(&path).expect("Failed to open test database");
        Self {
            store,
            path,
            _dir: dir,
        }
    }

    /// Stores a playlist and returns its id.
    pub fn add_playlist(&self, day: &str, songs: &[(&str, &str)]) -> i64 {
        let songs: Vec<NewSong> = songs
            .iter()
            .map(|(artist, title)| NewSong::new(*artist, *title))
            .collect();
        self.store
            .upsert_playlist_and_songs(parse_day(day), &songs)
            .expect("Failed to add playlist")
    }

    /// Stores a playlist whose songs all already have Spotify ids, derived
    /// from the titles.
    pub fn add_enriched_playlist(&self, day: &str, songs: &[(&str, &str)]) -> i64 {
        let playlist_id = self.add_playlist(day, songs);
        let lookups: Vec<SongLookup> = self
            .store
            .playlist_songs(playlist_id)
            .expect("Failed to read playlist songs")
            .into_iter()
            .map(|song| SongLookup {
                song_id: song.id,
                spotify_id: Some(format!("track-{}", song.title)),
                checked_at: Utc::now(),
            })
            .collect();
        self.store
            .update_song_external_ids(&lookups)
            .expect("Failed to enrich songs");
        playlist_id
    }
}

pub fn parse_day(day: &str) -> NaiveDate {
    NaiveDate::parse_from_str(day, "%Y-%m-%d").expect("Invalid test day")
}
