/// Thin HTTP client for the Plex server itself: session listing and
/// artwork download. Everything carries the token plus the client
/// identification headers.

use std::io::Read;

use serde::Deserialize;
use thiserror::Error;

use super::{ArtFetcher, PlexSession, SessionSource};
use super::{PLEX_CLIENT_IDENTIFIER, PLEX_PRODUCT, PLEX_VERSION};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    #[error("unexpected response code {status} from {url}")]
    Status { status: u16, url: String },

    #[error("could not parse server response: {0}")]
    Malformed(String),

    #[error("could not read response body: {0}")]
    Body(String),
}

#[derive(Debug, Default, Deserialize)]
struct SessionsResponse {
    #[serde(rename = "MediaContainer", default)]
    media_container: MediaContainer,
}

#[derive(Debug, Default, Deserialize)]
struct MediaContainer {
    #[serde(rename = "Metadata", default)]
    metadata: Vec<PlexSession>,
}

/// Cheap to clone: the ureq agent shares its connection pool internally.
#[derive(Clone)]
pub struct PlexClient {
    agent: ureq::Agent,
    base_url: String,
    token: String,
}

impl PlexClient {
    pub fn new(agent: ureq::Agent, base_url: String, token: String) -> Self {
        PlexClient {
            agent,
            base_url,
            token,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn with_headers(&self, request: ureq::Request) -> ureq::Request {
        request
            .set("X-Plex-Client-Identifier", PLEX_CLIENT_IDENTIFIER)
            .set("X-Plex-Product", PLEX_PRODUCT)
            .set("X-Plex-Version", PLEX_VERSION)
            .set("X-Plex-Token", &self.token)
    }
}

impl SessionSource for PlexClient {
    fn sessions(&self) -> Result<Vec<PlexSession>, ClientError> {
        let url = format!("{}/status/sessions", self.base_url);
        let request = self
            .with_headers(self.agent.get(&url))
            .set("Accept", "application/json");

        match request.call() {
            Ok(response) => {
                let parsed: SessionsResponse = response
                    .into_json()
                    .map_err(|e| ClientError::Malformed(e.to_string()))?;
                Ok(parsed.media_container.metadata)
            }
            Err(ureq::Error::Status(status, _)) => Err(ClientError::Status { status, url }),
            Err(ureq::Error::Transport(t)) => Err(ClientError::Transport {
                url,
                reason: t.to_string(),
            }),
        }
    }
}

impl ArtFetcher for PlexClient {
    fn fetch_art(&self, url: &str) -> Result<Vec<u8>, ClientError> {
        tracing::debug!("[Client] Attempting to download album art from {}", url);

        match self.with_headers(self.agent.get(url)).call() {
            Ok(response) => {
                let mut bytes = Vec::new();
                response
                    .into_reader()
                    .read_to_end(&mut bytes)
                    .map_err(|e| ClientError::Body(e.to_string()))?;
                Ok(bytes)
            }
            Err(ureq::Error::Status(status, _)) => Err(ClientError::Status {
                status,
                url: url.to_string(),
            }),
            Err(ureq::Error::Transport(t)) => Err(ClientError::Transport {
                url: url.to_string(),
                reason: t.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Trimmed-down capture of a real /status/sessions body with one music
    // stream and one video stream.
    const SESSIONS_JSON: &str = r#"{
        "MediaContainer": {
            "size": 2,
            "Metadata": [
                {
                    "type": "movie",
                    "title": "Heat",
                    "User": { "id": "1", "title": "couch" }
                },
                {
                    "type": "track",
                    "title": "One More Time",
                    "parentTitle": "Discovery",
                    "grandparentTitle": "Daft Punk",
                    "thumb": "/library/metadata/42/thumb/1",
                    "parentThumb": "/library/metadata/41/thumb/1",
                    "User": { "id": "1", "title": "dj" }
                }
            ]
        }
    }"#;

    #[test]
    fn test_sessions_response_parses_metadata() {
        let parsed: SessionsResponse = serde_json::from_str(SESSIONS_JSON).unwrap();
        let sessions = parsed.media_container.metadata;

        assert_eq!(sessions.len(), 2);
        assert!(!sessions[0].is_track());
        assert!(sessions[1].is_track());
        assert_eq!(sessions[1].artist, "Daft Punk");
        assert_eq!(sessions[1].album, "Discovery");
        assert_eq!(sessions[1].username(), "dj");
        assert_eq!(sessions[1].art(), Some("/library/metadata/42/thumb/1"));
    }

    #[test]
    fn test_idle_server_yields_no_sessions() {
        // Plex omits the Metadata array entirely when nothing is playing
        let parsed: SessionsResponse =
            serde_json::from_str(r#"{ "MediaContainer": { "size": 0 } }"#).unwrap();
        assert!(parsed.media_container.metadata.is_empty());
    }
}
