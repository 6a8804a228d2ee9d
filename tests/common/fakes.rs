//! In-memory stand-ins for the legacy site and Spotify

use super::fixtures::{index_page, inline_page, link_for, table_page};
use super::constants::SPOTIFY_USER_ID;
use deathguild::legacy_site::{PlaylistLink, PlaylistSource, ScrapeError};
use deathguild::spotify::{
    PlaylistPage, PlaylistSummary, SpotifyError, StreamingService, TrackMatch,
};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Serves an index linking every added page, in the order they were added.
#[derive(Default)]
pub struct FakePlaylistSource {
    days: Vec<String>,
    pages: HashMap<String, String>,
    fetched: Mutex<Vec<String>>,
}

impl FakePlaylistSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, day: &str, html: String) -> Self {
        self.days.push(day.to_string());
        self.pages.insert(link_for(day), html);
        self
    }

    pub fn with_table_page(self, day: &str, songs: &[(&str, &str)]) -> Self {
        self.with_page(day, table_page(songs))
    }

    pub fn with_inline_page(self, day: &str, songs: &[(&str, &str)]) -> Self {
        self.with_page(day, inline_page(songs))
    }

    /// Links of every playlist page fetched so far.
    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

impl PlaylistSource for FakePlaylistSource {
    fn fetch_index(&self) -> Result<String, ScrapeError> {
        let days: Vec<&str> = self.days.iter().map(String::as_str).collect();
        Ok(index_page(&days))
    }

    fn fetch_playlist(&self, link: &PlaylistLink) -> Result<String, ScrapeError> {
        self.fetched.lock().unwrap().push(link.to_string());
        self.pages
            .get(link.as_str())
            .cloned()
            .ok_or_else(|| ScrapeError::Http {
                url: link.to_string(),
                reason: "status code 404 Not Found".to_string(),
            })
    }
}

#[derive(Default)]
struct SpotifyState {
    searches: Vec<String>,
    playlists: Vec<PlaylistSummary>,
    created: Vec<String>,
    tracks: HashMap<String, Vec<String>>,
    next_playlist: usize,
}

/// Answers searches from a fixed query table and keeps playlists in memory.
#[derive(Default)]
pub struct FakeStreamingService {
    results: HashMap<String, String>,
    failing_queries: HashSet<String>,
    failing_replace: bool,
    state: Mutex<SpotifyState>,
}

impl FakeStreamingService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `artist:{artist} {title}` find `track_id`.
    pub fn with_track(mut self, artist: &str, title: &str, track_id: &str) -> Self {
        self.results
            .insert(format!("artist:{} {}", artist, title), track_id.to_string());
        self
    }

    /// Makes `artist:{artist} {title}` fail with a server error.
    pub fn failing_on(mut self, artist: &str, title: &str) -> Self {
        self.failing_queries
            .insert(format!("artist:{} {}", artist, title));
        self
    }

    /// Makes every track replacement hit the rate limit.
    pub fn failing_replace(mut self) -> Self {
        self.failing_replace = true;
        self
    }

    pub fn with_playlist(self, name: &str, id: &str) -> Self {
        self.state.lock().unwrap().playlists.push(PlaylistSummary {
            id: id.to_string(),
            name: name.to_string(),
        });
        self
    }

    pub fn searches(&self) -> Vec<String> {
        self.state.lock().unwrap().searches.clone()
    }

    /// Names of playlists created through the service.
    pub fn created(&self) -> Vec<String> {
        self.state.lock().unwrap().created.clone()
    }

    pub fn playlist_id(&self, name: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .playlists
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.id.clone())
    }

    /// Current tracks of the playlist called `name`.
    pub fn tracks_of(&self, name: &str) -> Option<Vec<String>> {
        let id = self.playlist_id(name)?;
        self.state.lock().unwrap().tracks.get(&id).cloned()
    }
}

impl StreamingService for FakeStreamingService {
    fn search_track(&self, query: &str) -> Result<Option<TrackMatch>, SpotifyError> {
        self.state.lock().unwrap().searches.push(query.to_string());
        if self.failing_queries.contains(query) {
            return Err(SpotifyError::Status {
                status: 500,
                body: "internal error".to_string(),
            });
        }
        Ok(self.results.get(query).map(|id| TrackMatch {
            id: id.clone(),
            name: query.to_string(),
            artists: Vec::new(),
        }))
    }

    fn current_user_id(&self) -> Result<String, SpotifyError> {
        Ok(SPOTIFY_USER_ID.to_string())
    }

    fn list_playlists_page(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<PlaylistPage, SpotifyError> {
        let state = self.state.lock().unwrap();
        let items: Vec<PlaylistSummary> = state
            .playlists
            .iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();
        Ok(PlaylistPage {
            has_next: offset + items.len() < state.playlists.len(),
            total: state.playlists.len(),
            items,
        })
    }

    fn create_playlist(
        &self,
        user_id: &str,
        name: &str,
        _description: &str,
    ) -> Result<PlaylistSummary, SpotifyError> {
        assert_eq!(user_id, SPOTIFY_USER_ID);
        let mut state = self.state.lock().unwrap();
        state.next_playlist += 1;
        let playlist = PlaylistSummary {
            id: format!("created-{}", state.next_playlist),
            name: name.to_string(),
        };
        state.playlists.push(playlist.clone());
        state.created.push(name.to_string());
        Ok(playlist)
    }

    fn replace_playlist_tracks(
        &self,
        playlist_id: &str,
        track_ids: &[String],
    ) -> Result<(), SpotifyError> {
        if self.failing_replace {
            return Err(SpotifyError::RateLimited {
                retry_after: Some(30),
            });
        }
        if track_ids.len() > deathguild::spotify::MAX_TRACKS_PER_REQUEST {
            return Err(SpotifyError::Status {
                status: 400,
                body: "too many tracks".to_string(),
            });
        }
        self.state
            .lock()
            .unwrap()
            .tracks
            .insert(playlist_id.to_string(), track_ids.to_vec());
        Ok(())
    }
}
