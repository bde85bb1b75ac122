// Manually declare the module paths so we don't have to restructure the
// whole project ...common trick for testing modules in isolation
#[path = "../plex/mod.rs"]
mod plex;
#[path = "../settings.rs"]
mod settings;

use std::process;

use plex::auth::AuthTokenProvider;
use plex::client::PlexClient;
use plex::SessionSource;
use settings::Settings;

fn main() {
    println!("========================================");
    println!("   Plex Session Inspection CLI          ");
    println!("========================================");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("ERROR: {e}");
            process::exit(1);
        }
    };

    let agent = ureq::AgentBuilder::new().build();

    println!("[*] Signing in as {}...", settings.plex.username);
    let mut auth = AuthTokenProvider::new(
        agent.clone(),
        settings.plex.username.clone(),
        settings.plex.password.clone(),
    );
    let token = match auth.acquire() {
        Ok(token) => token.to_string(),
        Err(e) => {
            eprintln!("Failed to get authentication token: {e}");
            process::exit(1);
        }
    };

    let client = PlexClient::new(agent, settings.base_url(), token);

    println!("[*] Fetching sessions from {}...", client.base_url());
    let sessions = match client.sessions() {
        Ok(sessions) => sessions,
        Err(e) => {
            eprintln!("Failed to fetch sessions: {e}");
            process::exit(1);
        }
    };

    if sessions.is_empty() {
        println!("\nNo active streams.");
        return;
    }

    println!("\n{} active stream(s):", sessions.len());
    for session in &sessions {
        println!("\n🎵 {} ({})", session.title, session.media_type);
        println!("   User:   {}", session.username());
        println!("   Artist: {}", session.artist);
        println!("   Album:  {}", session.album);
        match session.art() {
            Some(path) => println!("   Art:    {path}"),
            None => println!("   Art:    [none at any level]"),
        }
    }
}
