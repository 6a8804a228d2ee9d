use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
pub(super) struct TokenResponse {
    pub access_token: String,
    pub expires_in: u64,
    /// Spotify sometimes rotates the refresh token.
    pub refresh_token: Option<String>,
}

#[derive(Deserialize)]
pub(super) struct Paging<T> {
    pub items: Vec<T>,
    #[serde(default)]
    pub total: usize,
    pub next: Option<String>,
}

#[derive(Deserialize)]
pub(super) struct SearchResponse {
    pub tracks: Option<Paging<Track>>,
}

#[derive(Deserialize)]
pub(super) struct Track {
    /// Null for local files.
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<SimpleArtist>,
}

#[derive(Deserialize)]
pub(super) struct SimpleArtist {
    pub name: String,
}

#[derive(Deserialize)]
pub(super) struct CurrentUser {
    pub id: String,
}

#[derive(Deserialize)]
pub(super) struct SimplePlaylist {
    pub id: String,
    pub name: String,
}

#[derive(Serialize)]
pub(super) struct CreatePlaylistRequest<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub public: bool,
}

#[derive(Serialize)]
pub(super) struct ReplaceTracksRequest {
    pub uris: Vec<String>,
}
