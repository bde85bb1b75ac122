/// Configuration loading and validation
/// Loaded once at startup, immutable afterwards -- every component gets an
/// Arc<Settings> instead of reaching into ambient global state.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::Deserialize;
use thiserror::Error;

/// Plex media servers listen on a fixed port
pub const PLEX_PORT: u16 = 32400;

/// Environment variable that overrides the config file location
pub const CONFIG_ENV_VAR: &str = "PLEXNP_CONFIG";

const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("unable to load config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config file {path} is invalid: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no config file found (checked $PLEXNP_CONFIG, ./config.json and the user config directory)")]
    NotFound,

    #[error("unable to connect to Plex server {server}. Check address and try again ({reason})")]
    ServerUnreachable { server: String, reason: String },
}

/// The whole config file. Section names mirror the INI layout the original
/// Windows tool shipped with, so existing configs translate key-for-key.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(rename = "GENERAL")]
    pub general: General,

    #[serde(rename = "PLEX")]
    pub plex: Plex,

    #[serde(rename = "LOGGING", default)]
    pub logging: Logging,
}

#[derive(Debug, Clone, Deserialize)]
pub struct General {
    /// Seconds between poll cycles
    #[serde(rename = "Delay", default = "default_delay")]
    pub delay_secs: u64,

    /// Directory the overlay tool watches
    #[serde(rename = "Monitor_Directory")]
    pub monitor_directory: PathBuf,

    /// File name for the "Artist - Title" text
    #[serde(rename = "Playing_File")]
    pub playing_file: String,

    /// File name for the resized album art
    #[serde(rename = "Art_File")]
    pub art_file: String,

    /// Published art width in pixels (height scales to match)
    #[serde(rename = "Thumb_Size", default = "default_thumb_size")]
    pub thumb_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Plex {
    #[serde(rename = "Username")]
    pub username: String,

    #[serde(rename = "Password")]
    pub password: String,

    /// Host name or IP of the Plex server (no scheme, no port)
    #[serde(rename = "Server")]
    pub server: String,

    /// When true, track sessions owned by a different user are skipped
    /// outright. When false they are only logged, matching the historical
    /// behavior of this tool.
    #[serde(rename = "Enforce_User", default)]
    pub enforce_user: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Logging {
    #[serde(rename = "Level", default = "default_log_level")]
    pub level: String,
}

impl Default for Logging {
    fn default() -> Self {
        Logging {
            level: default_log_level(),
        }
    }
}

fn default_delay() -> u64 {
    2
}

fn default_thumb_size() -> u32 {
    500
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Settings {
    /// Load from the first config file found (env override, cwd, user config dir)
    pub fn load() -> Result<Self, SettingsError> {
        let path = resolve_config_path().ok_or(SettingsError::NotFound)?;
        println!("Loading config: {}", path.display());
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let raw = fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Base URL for all requests against the configured server
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.plex.server, PLEX_PORT)
    }

    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.general.delay_secs)
    }

    /// Full path of the now-playing text file
    pub fn playing_path(&self) -> PathBuf {
        self.general.monitor_directory.join(&self.general.playing_file)
    }

    /// Full path of the published art file
    pub fn art_path(&self) -> PathBuf {
        self.general.monitor_directory.join(&self.general.art_file)
    }

    /// Make sure the configured server can be resolved before we bother
    /// signing in. A 401 means the server is there and merely wants a token,
    /// so it passes. Anything else is a startup failure.
    pub fn validate_server(&self, agent: &ureq::Agent) -> Result<(), SettingsError> {
        let url = self.base_url();
        match agent.get(&url).call() {
            Ok(_) => Ok(()),
            Err(ureq::Error::Status(401, _)) => {
                tracing::debug!("[Settings] Server {} answered 401, treating as valid", url);
                Ok(())
            }
            Err(ureq::Error::Status(code, _)) => Err(SettingsError::ServerUnreachable {
                server: self.plex.server.clone(),
                reason: format!("unexpected response code {code}"),
            }),
            Err(ureq::Error::Transport(t)) => Err(SettingsError::ServerUnreachable {
                server: self.plex.server.clone(),
                reason: t.to_string(),
            }),
        }
    }
}

fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(explicit) = env::var(CONFIG_ENV_VAR) {
        return Some(PathBuf::from(explicit));
    }

    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.is_file() {
        return Some(local);
    }

    if let Some(dirs) = ProjectDirs::from("", "", "plexnowplaying") {
        let candidate = dirs.config_dir().join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            return Some(candidate);
        }
    }

    None
}
