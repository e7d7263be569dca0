//! Client configuration resolved from ARMOIRE_* environment variables.
//!
//! Everything here is read once at startup; the rest of the crate takes a
//! [`ClientConfig`] by reference instead of touching the environment again.

use std::path::PathBuf;
use std::time::Duration;

use crate::util::env_nonempty;

/// Default API origin used when ARMOIRE_API_BASE_URL is not set.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080";

/// Default directory for durable (device-scoped) state.
pub const DEFAULT_STATE_DIR: &str = "./data/state";

/// Runtime configuration for the API client and the scope stores.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the commerce backend, without a trailing slash requirement.
    pub base_url: String,
    /// Overall per-request timeout; `None` leaves the HTTP client default.
    pub timeout: Option<Duration>,
    /// Root directory for the durable scope (survives restarts).
    pub state_dir: PathBuf,
    /// Root directory for the ephemeral scope (cleared with the runtime dir).
    pub session_dir: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: None,
            state_dir: PathBuf::from(DEFAULT_STATE_DIR),
            session_dir: std::env::temp_dir().join("armoire-session"),
        }
    }
}

impl ClientConfig {
    /// Resolve configuration from the environment.
    ///
    /// Environment:
    /// - ARMOIRE_API_BASE_URL          -> backend origin (default http://127.0.0.1:8080)
    /// - ARMOIRE_HTTP_TIMEOUT_SECONDS  -> overall request timeout (u64)
    /// - ARMOIRE_STATE_DIR             -> durable scope root (default ./data/state)
    /// - ARMOIRE_SESSION_DIR           -> ephemeral scope root
    ///                                    (default $XDG_RUNTIME_DIR/armoire, else <tmp>/armoire-session)
    pub fn from_env() -> Self {
        Self {
            base_url: api_base_url_from_env(),
            timeout: env_nonempty("ARMOIRE_HTTP_TIMEOUT_SECONDS")
                .and_then(|s| s.parse::<u64>().ok())
                .map(Duration::from_secs),
            state_dir: env_nonempty("ARMOIRE_STATE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR)),
            session_dir: session_dir_from_env(),
        }
    }
}

/// Resolve the API base URL from environment or fall back to the local default.
fn api_base_url_from_env() -> String {
    match env_nonempty("ARMOIRE_API_BASE_URL") {
        Some(url) => url,
        None => {
            static LOGGED: std::sync::OnceLock<()> = std::sync::OnceLock::new();
            LOGGED.get_or_init(|| {
                tracing::warn!(
                    "ARMOIRE_API_BASE_URL not set; defaulting to {DEFAULT_BASE_URL}"
                );
            });
            DEFAULT_BASE_URL.into()
        }
    }
}

fn session_dir_from_env() -> PathBuf {
    if let Some(dir) = env_nonempty("ARMOIRE_SESSION_DIR") {
        return PathBuf::from(dir);
    }
    match env_nonempty("XDG_RUNTIME_DIR") {
        Some(runtime) => PathBuf::from(runtime).join("armoire"),
        None => std::env::temp_dir().join("armoire-session"),
    }
}
