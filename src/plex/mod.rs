use serde::Deserialize;

pub mod auth;
pub mod client;

pub use client::ClientError;

// Client identification headers sent on every request to Plex, including the
// plex.tv sign-in. Plex uses these to label the device in its dashboard.
pub const PLEX_PRODUCT: &str = "Plex Now Playing";
pub const PLEX_CLIENT_IDENTIFIER: &str = "plexnowplaying";
pub const PLEX_VERSION: &str = "1";

/// One active playback stream as reported by /status/sessions.
///
/// Plex flattens the album/artist hierarchy into parent/grandparent fields:
/// for a track session, `parentTitle` is the album and `grandparentTitle`
/// the artist.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlexSession {
    #[serde(rename = "type", default)]
    pub media_type: String,

    #[serde(default)]
    pub title: String,

    #[serde(rename = "parentTitle", default)]
    pub album: String,

    #[serde(rename = "grandparentTitle", default)]
    pub artist: String,

    /// Track-level artwork path
    #[serde(default)]
    pub thumb: Option<String>,

    /// Album-level artwork path
    #[serde(rename = "parentThumb", default)]
    pub parent_thumb: Option<String>,

    /// Artist-level artwork path
    #[serde(rename = "grandparentThumb", default)]
    pub grandparent_thumb: Option<String>,

    /// Account that owns the stream
    #[serde(rename = "User", default)]
    pub user: Option<SessionUser>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionUser {
    #[serde(default)]
    pub title: String,
}

impl PlexSession {
    /// Only music sessions are actionable; everything else is skipped.
    pub fn is_track(&self) -> bool {
        self.media_type == "track"
    }

    pub fn username(&self) -> &str {
        self.user.as_ref().map(|u| u.title.as_str()).unwrap_or("")
    }

    /// Artwork with fallback: track art first, then album, then artist.
    pub fn art(&self) -> Option<&str> {
        self.thumb
            .as_deref()
            .or(self.parent_thumb.as_deref())
            .or(self.grandparent_thumb.as_deref())
    }
}

/// Trait for listing active playback sessions.
/// The poller only sees this, so tests can feed it canned session lists.
pub trait SessionSource {
    fn sessions(&self) -> Result<Vec<PlexSession>, ClientError>;
}

/// Trait for downloading artwork bytes.
/// The publisher only sees this, so tests can count and fake downloads.
pub trait ArtFetcher {
    fn fetch_art(&self, url: &str) -> Result<Vec<u8>, ClientError>;
}
