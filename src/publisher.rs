/// State publisher: writes the "Artist - Title" text file and, when the
/// track changed, downloads and resizes the album art next to it.
///
/// The text file doubles as the change detector. If the freshly computed
/// string matches what is already on disk the whole publish is a no-op,
/// which is what keeps an unchanged track from re-downloading art every
/// two seconds.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use image::imageops::FilterType;

use crate::plex::ArtFetcher;
use crate::poller::NowPlaying;
use crate::settings::Settings;

/// What a publish call actually did. Mostly of interest to tests and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// On-disk text already matches; nothing touched, no art fetched
    Unchanged,
    /// Text rewritten; the snapshot carried no art URL
    WrittenNoArt,
    /// Text rewritten and art republished
    WrittenWithArt,
    /// Text rewritten but the art step failed and was abandoned
    WrittenArtFailed,
}

pub struct StatePublisher<F: ArtFetcher> {
    fetcher: F,
    settings: Arc<Settings>,
}

impl<F: ArtFetcher> StatePublisher<F> {
    pub fn new(fetcher: F, settings: Arc<Settings>) -> Self {
        StatePublisher { fetcher, settings }
    }

    pub fn publish(&self, now: &NowPlaying) -> PublishOutcome {
        let text = format!("{} - {}", now.artist, now.title);
        let playing_path = self.settings.playing_path();

        let unchanged = fs::read_to_string(&playing_path)
            .map(|current| current == text)
            .unwrap_or(false);
        if unchanged {
            tracing::debug!("[Publisher] Still playing: {}", text);
            return PublishOutcome::Unchanged;
        }

        match fs::write(&playing_path, &text) {
            Ok(()) => tracing::info!("[Publisher] Now playing: {}", text),
            // Text write failures are logged and absorbed; the next cycle
            // will try again because the on-disk state still differs.
            Err(e) => tracing::error!("[Publisher] Failed to write now playing file: {}", e),
        }

        let Some(url) = now.art_url.as_deref() else {
            return PublishOutcome::WrittenNoArt;
        };

        match self.publish_art(url) {
            Ok(()) => PublishOutcome::WrittenWithArt,
            Err(e) => {
                // Partial success: the text file stands even when art fails
                tracing::error!("[Publisher] Error getting album art: {:#}", e);
                PublishOutcome::WrittenArtFailed
            }
        }
    }

    fn publish_art(&self, url: &str) -> anyhow::Result<()> {
        let bytes = self.fetcher.fetch_art(url)?;

        let art_path = self.settings.art_path();
        let temp_path = art_path.with_extension("tmp");
        fs::write(&temp_path, &bytes).context("failed to save downloaded album art")?;
        tracing::debug!("[Publisher] Saved album art ({} bytes)", bytes.len());

        resize_to_width(&temp_path, &art_path, self.settings.general.thumb_size)
    }
}

/// Force the configured width, scale height to keep the aspect ratio,
/// resample with a smooth filter so the overlay gets a consistent size.
fn resize_to_width(source: &Path, dest: &Path, width: u32) -> anyhow::Result<()> {
    let img = image::io::Reader::open(source)
        .context("could not open downloaded album art")?
        .with_guessed_format()
        .context("could not probe album art format")?
        .decode()
        .context("could not decode album art")?;

    let scale = width as f32 / img.width() as f32;
    let height = ((img.height() as f32 * scale) as u32).max(1);
    let resized = img.resize_exact(width, height, FilterType::Lanczos3);

    if let Err(e) = fs::remove_file(source) {
        tracing::error!("[Publisher] Could not remove temp art file: {}", e);
    }
    // The overlay tool may be holding the old art file open. A failed
    // removal is logged and we still attempt the final save.
    if dest.exists() {
        if let Err(e) = fs::remove_file(dest) {
            tracing::error!("[Publisher] Album art is locked, cannot remove: {}", e);
        }
    }

    resized.save(dest).context("could not save resized album art")?;
    tracing::debug!("[Publisher] Resized album art to {}x{}", width, height);
    Ok(())
}
