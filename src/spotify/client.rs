//! Blocking Spotify Web API client.
//!
//! Authenticates with a long-lived refresh token: an access token is fetched
//! on first use and refreshed shortly before it expires.

use super::models::{
    CreatePlaylistRequest, CurrentUser, Paging, ReplaceTracksRequest, SearchResponse,
    SimplePlaylist, TokenResponse,
};
use super::{
    PlaylistPage, PlaylistSummary, SpotifyError, StreamingService, TrackMatch,
    MAX_PLAYLISTS_PER_PAGE, MAX_TRACKS_PER_REQUEST,
};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::RETRY_AFTER;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, info};

const SPOTIFY_API_BASE: &str = "https://api.spotify.com/v1";
const SPOTIFY_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

/// Refresh this long before the token actually expires.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct SpotifyCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

impl std::fmt::Debug for SpotifyCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpotifyCredentials")
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

struct AccessToken {
    value: String,
    expires_at: Instant,
}

impl AccessToken {
    fn is_fresh(&self, now: Instant) -> bool {
        now + TOKEN_EXPIRY_MARGIN < self.expires_at
    }
}

struct AuthState {
    refresh_token: String,
    access_token: Option<AccessToken>,
}

pub struct SpotifyClient {
    client: Client,
    client_id: String,
    client_secret: String,
    auth: Mutex<AuthState>,
}

impl SpotifyClient {
    pub fn new(credentials: SpotifyCredentials) -> Result<Self, SpotifyError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            client,
            client_id: credentials.client_id,
            client_secret: credentials.client_secret,
            auth: Mutex::new(AuthState {
                refresh_token: credentials.refresh_token,
                access_token: None,
            }),
        })
    }

    /// Returns a valid access token, refreshing it if needed. The lock is held
    /// across the refresh so concurrent callers wait for one refresh.
    fn access_token(&self) -> Result<String, SpotifyError> {
        let mut auth = self.auth.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(token) = &auth.access_token {
            if token.is_fresh(Instant::now()) {
                return Ok(token.value.clone());
            }
        }

        debug!("Refreshing Spotify access token");
        let response = self
            .client
            .post(SPOTIFY_TOKEN_URL)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", auth.refresh_token.as_str()),
            ])
            .send()?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(SpotifyError::Auth(format!("status {}: {}", status, body)));
        }

        let token: TokenResponse = decode(response)?;
        if let Some(rotated) = token.refresh_token {
            info!("Spotify rotated the refresh token");
            auth.refresh_token = rotated;
        }
        let value = token.access_token;
        auth.access_token = Some(AccessToken {
            value: value.clone(),
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        });
        Ok(value)
    }

    fn send(&self, request: RequestBuilder) -> Result<Response, SpotifyError> {
        let response = request.bearer_auth(self.access_token()?).send()?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = parse_retry_after(
                response
                    .headers()
                    .get(RETRY_AFTER)
                    .and_then(|v| v.to_str().ok()),
            );
            return Err(SpotifyError::RateLimited { retry_after });
        }
        if status == StatusCode::UNAUTHORIZED {
            // Force a refresh on the next call
            self.auth
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .access_token = None;
        }
        if !status.is_success() {
            return Err(SpotifyError::Status {
                status: status.as_u16(),
                body: response.text().unwrap_or_default(),
            });
        }
        Ok(response)
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, SpotifyError> {
        decode(self.send(self.client.get(url))?)
    }
}

fn decode<T: DeserializeOwned>(response: Response) -> Result<T, SpotifyError> {
    response
        .json()
        .map_err(|e| SpotifyError::Decode(e.to_string()))
}

fn parse_retry_after(header: Option<&str>) -> Option<u64> {
    header.and_then(|v| v.trim().parse().ok())
}

fn first_track_match(response: SearchResponse) -> Option<TrackMatch> {
    response
        .tracks?
        .items
        .into_iter()
        .find_map(|track| {
            Some(TrackMatch {
                id: track.id?,
                name: track.name,
                artists: track.artists.into_iter().map(|a| a.name).collect(),
            })
        })
}

fn playlist_page(paging: Paging<SimplePlaylist>) -> PlaylistPage {
    PlaylistPage {
        items: paging
            .items
            .into_iter()
            .map(|p| PlaylistSummary {
                id: p.id,
                name: p.name,
            })
            .collect(),
        total: paging.total,
        has_next: paging.next.is_some(),
    }
}

impl StreamingService for SpotifyClient {
    fn search_track(&self, query: &str) -> Result<Option<TrackMatch>, SpotifyError> {
        let url = format!(
            "{}/search?q={}&type=track&limit=1",
            SPOTIFY_API_BASE,
            urlencoding::encode(query)
        );
        let response: SearchResponse = self.get_json(&url)?;
        Ok(first_track_match(response))
    }

    fn current_user_id(&self) -> Result<String, SpotifyError> {
        let user: CurrentUser = self.get_json(&format!("{}/me", SPOTIFY_API_BASE))?;
        Ok(user.id)
    }

    fn list_playlists_page(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<PlaylistPage, SpotifyError> {
        let url = format!(
            "{}/me/playlists?limit={}&offset={}",
            SPOTIFY_API_BASE,
            limit.clamp(1, MAX_PLAYLISTS_PER_PAGE),
            offset
        );
        let paging: Paging<SimplePlaylist> = self.get_json(&url)?;
        Ok(playlist_page(paging))
    }

    fn create_playlist(
        &self,
        user_id: &str,
        name: &str,
        description: &str,
    ) -> Result<PlaylistSummary, SpotifyError> {
        let url = format!(
            "{}/users/{}/playlists",
            SPOTIFY_API_BASE,
            urlencoding::encode(user_id)
        );
        let request = self.client.post(&url).json(&CreatePlaylistRequest {
            name,
            description,
            public: true,
        });
        let created: SimplePlaylist = decode(self.send(request)?)?;
        Ok(PlaylistSummary {
            id: created.id,
            name: created.name,
        })
    }

    fn replace_playlist_tracks(
        &self,
        playlist_id: &str,
        track_ids: &[String],
    ) -> Result<(), SpotifyError> {
        if track_ids.len() > MAX_TRACKS_PER_REQUEST {
            return Err(SpotifyError::InvalidRequest(format!(
                "{} tracks exceed the limit of {} per request",
                track_ids.len(),
                MAX_TRACKS_PER_REQUEST
            )));
        }
        let url = format!(
            "{}/playlists/{}/tracks",
            SPOTIFY_API_BASE,
            urlencoding::encode(playlist_id)
        );
        let uris = track_ids
            .iter()
            .map(|id| format!("spotify:track:{}", id))
            .collect();
        self.send(self.client.put(&url).json(&ReplaceTracksRequest { uris }))?;
        Ok(())
    }
}
