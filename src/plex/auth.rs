/// Auth token bootstrap against plex.tv
///
/// One HTTPS POST with HTTP Basic credentials buys a bearer token that is
/// reused for the entire process lifetime. There is no refresh logic; if
/// plex.tv won't give us a token there is nothing downstream worth running,
/// so every failure here is surfaced to main as a typed error.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use thiserror::Error;

use super::{PLEX_CLIENT_IDENTIFIER, PLEX_PRODUCT, PLEX_VERSION};

const SIGN_IN_URL: &str = "https://plex.tv/users/sign_in.json";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("could not reach plex.tv: {0}")]
    Transport(String),

    #[error("failed to get token due to bad username/password")]
    Unauthorized,

    #[error("failed to get authentication token, plex.tv answered with status {0}")]
    Status(u16),

    #[error("plex.tv returned a valid response but for some reason there's no auth token")]
    MissingToken,

    #[error("could not parse plex.tv sign-in response: {0}")]
    Malformed(String),
}

pub struct AuthTokenProvider {
    agent: ureq::Agent,
    username: String,
    password: String,
    /// Memoized for the process lifetime; only the first acquire() hits plex.tv
    token: Option<String>,
}

impl AuthTokenProvider {
    pub fn new(agent: ureq::Agent, username: String, password: String) -> Self {
        AuthTokenProvider {
            agent,
            username,
            password,
            token: None,
        }
    }

    /// Returns the cached token, requesting one from plex.tv on first call.
    pub fn acquire(&mut self) -> Result<&str, AuthError> {
        if self.token.is_none() {
            let token = self.request_token()?;
            tracing::debug!("[Auth] Successfully retrieved auth token");
            self.token = Some(token);
        }

        Ok(self.token.as_deref().unwrap_or_default())
    }

    fn request_token(&self) -> Result<String, AuthError> {
        tracing::info!("[Auth] Getting auth token for user {}", self.username);

        let result = self
            .agent
            .post(SIGN_IN_URL)
            .set("Authorization", &basic_auth_header(&self.username, &self.password))
            .set("X-Plex-Client-Identifier", PLEX_CLIENT_IDENTIFIER)
            .set("X-Plex-Product", PLEX_PRODUCT)
            .set("X-Plex-Version", PLEX_VERSION)
            .send_string("");

        match result {
            Ok(response) => {
                let body: serde_json::Value = response
                    .into_json()
                    .map_err(|e| AuthError::Malformed(e.to_string()))?;
                extract_token(&body)
            }
            Err(ureq::Error::Status(code, _)) => Err(status_error(code)),
            Err(ureq::Error::Transport(t)) => Err(AuthError::Transport(t.to_string())),
        }
    }
}

/// Standard HTTP Basic authorization header value
pub fn basic_auth_header(username: &str, password: &str) -> String {
    format!("Basic {}", BASE64.encode(format!("{username}:{password}")))
}

fn status_error(code: u16) -> AuthError {
    if code == 401 {
        AuthError::Unauthorized
    } else {
        AuthError::Status(code)
    }
}

/// Pull the token out of a sign-in response body.
/// A success status without a token violates the plex.tv contract and is
/// treated as fatal by the caller.
fn extract_token(body: &serde_json::Value) -> Result<String, AuthError> {
    match body.pointer("/user/authToken").and_then(|v| v.as_str()) {
        Some(token) if !token.is_empty() => Ok(token.to_string()),
        _ => Err(AuthError::MissingToken),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_returns_cached_token_without_a_request() {
        let mut provider =
            AuthTokenProvider::new(ureq::agent(), "u".to_string(), "p".to_string());
        provider.token = Some("cached".to_string());

        // Would hit plex.tv (and fail in an offline test run) if the
        // memoization were broken
        assert_eq!(provider.acquire().unwrap(), "cached");
        assert_eq!(provider.acquire().unwrap(), "cached");
    }

    #[test]
    fn test_basic_auth_header_encoding() {
        // base64("user:pass")
        assert_eq!(basic_auth_header("user", "pass"), "Basic dXNlcjpwYXNz");
    }

    #[test]
    fn test_extract_token_from_sign_in_body() {
        let body = serde_json::json!({
            "user": { "username": "dj", "authToken": "abc123" }
        });
        assert_eq!(extract_token(&body).unwrap(), "abc123");
    }

    #[test]
    fn test_missing_token_is_a_protocol_error() {
        let body = serde_json::json!({ "user": { "username": "dj" } });
        assert!(matches!(extract_token(&body), Err(AuthError::MissingToken)));

        let body = serde_json::json!({ "error": "nope" });
        assert!(matches!(extract_token(&body), Err(AuthError::MissingToken)));
    }

    #[test]
    fn test_401_maps_to_authorization_specific_error() {
        let err = status_error(401);
        assert!(matches!(err, AuthError::Unauthorized));
        assert!(err.to_string().contains("username/password"));
    }

    #[test]
    fn test_other_statuses_map_to_generic_failure() {
        let err = status_error(500);
        assert!(matches!(err, AuthError::Status(500)));
        assert!(err.to_string().contains("500"));
    }
}
