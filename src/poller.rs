/// Now-playing poller: queries the session list on a fixed interval,
/// selects the first qualifying track stream and hands it to the publisher.

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};

use crate::plex::{ArtFetcher, PlexSession, SessionSource};
use crate::publisher::StatePublisher;
use crate::settings::Settings;

/// The track selected from one poll cycle, ready for publishing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NowPlaying {
    pub artist: String,
    pub album: String,
    pub title: String,
    /// Fully qualified artwork URL, if any level of the hierarchy has art
    pub art_url: Option<String>,
}

pub struct NowPlayingPoller<S: SessionSource, F: ArtFetcher> {
    source: S,
    publisher: StatePublisher<F>,
    settings: Arc<Settings>,
}

impl<S: SessionSource, F: ArtFetcher> NowPlayingPoller<S, F> {
    pub fn new(source: S, publisher: StatePublisher<F>, settings: Arc<Settings>) -> Self {
        NowPlayingPoller {
            source,
            publisher,
            settings,
        }
    }

    /// One session query. None means nothing actionable is playing, which
    /// leaves previously published files untouched.
    pub fn poll(&self) -> Option<NowPlaying> {
        let sessions = match self.source.sessions() {
            Ok(sessions) => sessions,
            Err(e) => {
                // Recoverable: skip this cycle, try again on the next one
                tracing::error!("[Poller] Failed to fetch sessions: {}", e);
                return None;
            }
        };

        tracing::debug!("[Poller] Loaded {} active streams", sessions.len());
        select_now_playing(
            &sessions,
            &self.settings.plex.username,
            self.settings.plex.enforce_user,
            &self.settings.base_url(),
        )
    }

    /// One full poll-and-publish cycle
    pub fn tick(&self) {
        if let Some(now) = self.poll() {
            self.publisher.publish(&now);
        }
    }

    /// Cycle until a stop message arrives (or the sender goes away).
    /// The delay between cycles is the blocking wait on the stop channel,
    /// so shutdown is honored without finishing a sleep first.
    pub fn run(&self, stop: Receiver<()>) {
        tracing::info!(
            "[Poller] Polling every {}s as user {}",
            self.settings.general.delay_secs,
            self.settings.plex.username
        );

        loop {
            self.tick();

            match stop.recv_timeout(self.delay()) {
                Err(RecvTimeoutError::Timeout) => continue,
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        tracing::info!("[Poller] Stopped");
    }

    fn delay(&self) -> Duration {
        self.settings.delay()
    }
}

/// Pick the first track session in source order. Multiple simultaneous
/// streams are not aggregated; source order wins.
fn select_now_playing(
    sessions: &[PlexSession],
    configured_user: &str,
    enforce_user: bool,
    base_url: &str,
) -> Option<NowPlaying> {
    for session in sessions {
        if !session.is_track() {
            tracing::debug!(
                "[Poller] Skipping media type {}: {}",
                session.media_type,
                session.title
            );
            continue;
        }

        if session.username() != configured_user {
            tracing::debug!(
                "[Poller] Music played by different user ({})",
                session.username()
            );
            if enforce_user {
                continue;
            }
        }

        return Some(NowPlaying {
            artist: session.artist.clone(),
            album: session.album.clone(),
            title: session.title.clone(),
            art_url: session.art().map(|path| expand_art_url(base_url, path)),
        });
    }

    None
}

/// Plex reports artwork as server-relative paths; expand them against the
/// server base URL. Absolute URLs pass through untouched.
fn expand_art_url(base_url: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        path.to_string()
    } else {
        format!("{base_url}{path}")
    }
}
