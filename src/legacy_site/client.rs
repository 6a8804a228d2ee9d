use super::{PlaylistLink, ScrapeError};
use reqwest::blocking::Client;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "http://www.deathguild.com";
const INDEX_PATH: &str = "/playdates";

/// Where playlist documents come from.
pub trait PlaylistSource: Send + Sync {
    fn fetch_index(&self) -> Result<String, ScrapeError>;
    fn fetch_playlist(&self, link: &PlaylistLink) -> Result<String, ScrapeError>;
}

pub struct LegacySiteClient {
    client: Client,
    base_url: String,
}

impl LegacySiteClient {
    pub fn new(base_url: &str) -> Result<Self, ScrapeError> {
        let client = Client::builder()
            .user_agent(concat!("deathguild/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ScrapeError::Http {
                url: base_url.to_string(),
                reason: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn playlist_url(&self, link: &PlaylistLink) -> String {
        let link = link.as_str();
        if link.starts_with("http://") || link.starts_with("https://") {
            link.to_string()
        } else if link.starts_with('/') {
            format!("{}{}", self.base_url, link)
        } else {
            format!("{}/{}", self.base_url, link)
        }
    }

    fn get(&self, url: &str) -> Result<String, ScrapeError> {
        debug!("Requesting {}", url);
        let http_error = |reason: String| ScrapeError::Http {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| http_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(http_error(format!("status code {}", status)));
        }

        response.text().map_err(|e| http_error(e.to_string()))
    }
}

impl PlaylistSource for LegacySiteClient {
    fn fetch_index(&self) -> Result<String, ScrapeError> {
        self.get(&format!("{}{}", self.base_url, INDEX_PATH))
    }

    fn fetch_playlist(&self, link: &PlaylistLink) -> Result<String, ScrapeError> {
        self.get(&self.playlist_url(link))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playlist_url() {
        let client = LegacySiteClient::new("http://www.deathguild.com/").unwrap();
        assert_eq!(
            client.playlist_url(&PlaylistLink("/playlist/2016-09-26".to_string())),
            "http://www.deathguild.com/playlist/2016-09-26"
        );
        assert_eq!(
            client.playlist_url(&PlaylistLink("playlist/2016-09-26".to_string())),
            "http://www.deathguild.com/playlist/2016-09-26"
        );
        assert_eq!(
            client.playlist_url(&PlaylistLink(
                "http://www.deathguild.com/playlist/1995-10-16".to_string()
            )),
            "http://www.deathguild.com/playlist/1995-10-16"
        );
    }
}
