mod plex;
mod poller;
mod publisher;
mod settings;

use std::process;
use std::sync::Arc;

use crossbeam_channel::bounded;
use tracing_subscriber::EnvFilter;

use crate::plex::auth::AuthTokenProvider;
use crate::plex::client::PlexClient;
use crate::poller::NowPlayingPoller;
use crate::publisher::StatePublisher;
use crate::settings::Settings;

/// CLI overrides for the config file. No validation is performed;
/// unknown flags are ignored.
#[derive(Debug, Default, PartialEq)]
struct CliArgs {
    server: Option<String>,
    username: Option<String>,
    password: Option<String>,
}

impl CliArgs {
    fn parse<I: Iterator<Item = String>>(mut args: I) -> Self {
        let mut out = CliArgs::default();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--server" => out.server = args.next(),
                "--username" => out.username = args.next(),
                "--password" => out.password = args.next(),
                _ => {}
            }
        }
        out
    }

    fn apply(self, settings: &mut Settings) {
        if let Some(server) = self.server {
            settings.plex.server = server;
        }
        if let Some(username) = self.username {
            settings.plex.username = username;
        }
        if let Some(password) = self.password {
            settings.plex.password = password;
        }
    }
}

/// RUST_LOG wins when set; otherwise the config file level applies
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let args = CliArgs::parse(std::env::args().skip(1));

    // Config comes first; the log level lives inside it
    let mut settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("ERROR: {e}");
            process::exit(1);
        }
    };
    args.apply(&mut settings);
    init_logging(&settings.logging.level);

    let agent = ureq::AgentBuilder::new().build();

    if let Err(e) = settings.validate_server(&agent) {
        eprintln!("ERROR: {e}");
        process::exit(1);
    }
    println!("Configuration successfully loaded");

    let settings = Arc::new(settings);

    let mut auth = AuthTokenProvider::new(
        agent.clone(),
        settings.plex.username.clone(),
        settings.plex.password.clone(),
    );
    let token = match auth.acquire() {
        Ok(token) => token.to_string(),
        Err(e) => {
            // Nothing downstream can work without a token
            tracing::error!("[Main] {}", e);
            eprintln!("Failed to get authentication token: {e}");
            process::exit(1);
        }
    };

    let client = PlexClient::new(agent, settings.base_url(), token);
    let publisher = StatePublisher::new(client.clone(), settings.clone());
    let poller = NowPlayingPoller::new(client, publisher, settings.clone());

    // Ctrl+C turns into a stop message so the poll loop can wind down
    // instead of dying mid-write
    let (stop_tx, stop_rx) = bounded::<()>(1);
    if let Err(e) = ctrlc::set_handler(move || {
        let _ = stop_tx.try_send(());
    }) {
        tracing::warn!("[Main] Could not install Ctrl+C handler: {}", e);
    }

    poller.run(stop_rx);

    println!("[Main] ✓ Shutdown complete");
}
