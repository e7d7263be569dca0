//! Session lifecycle: bootstrap, login, logout and role checks.
//!
//! The manager owns the authentication state machine:
//!
//! `Uninitialized -> Bootstrapping -> { Authenticated, Anonymous }`
//!
//! - `bootstrap` runs once at startup: recover a token from the vault, prove
//!   it against the profile endpoint and land in a terminal state. It never
//!   fails; every degraded path collapses to `Anonymous`.
//! - `login` performs the password grant, persists the token under the
//!   caller's chosen scope, fetches the profile and becomes `Authenticated`.
//! - `logout` tells the backend best-effort, then always clears local state.
//!
//! The manager is the only writer of the shared [`CurrentToken`] cell.

use std::sync::RwLock;

use http::Method;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api_client::{ApiClient, ApiError, RequestCall};
use crate::config::ClientConfig;
use crate::models::{TokenResponse, UserProfile};
use crate::secret_store::SecretStoreError;
use crate::storage::{make_store, StorageScope};
use crate::token_vault::TokenVault;

const LOGIN_PATH: &str = "/auth/controller/api/v1/login";
const LOGOUT_PATH: &str = "/auth/controller/api/v1/logout";
const ME_PATH: &str = "/auth/controller/api/v1/me";

// ==============================
// State & errors
// ==============================

/// Where the session currently stands. Route guards consume this directly.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// Nothing has run yet.
    Uninitialized,
    /// Startup recovery is in flight; callers should hold, not redirect.
    Bootstrapping,
    /// No valid session; the login page is the only destination.
    Anonymous,
    /// A proven session with the operator's profile attached.
    Authenticated(UserProfile),
}

#[derive(Debug, Error)]
pub enum AuthError {
    /// The backend rejected the credentials (any non-2xx on login).
    #[error("Invalid credentials ({status}): {message}")]
    InvalidCredentials { status: u16, message: String },
    /// Login succeeded but the response carried no usable access token.
    #[error("Login response missing access_token")]
    MalformedTokenResponse,
    /// The token could not be persisted to the vault.
    #[error("Token persistence failed: {0}")]
    Persist(#[from] SecretStoreError),
    /// Transport or API failure outside the credential check itself.
    #[error(transparent)]
    Api(#[from] ApiError),
}

// ==============================
// Manager
// ==============================

/// Owns the session state machine and the write side of the token cell.
pub struct SessionManager {
    api: ApiClient,
    vault: TokenVault,
    state: RwLock<SessionState>,
}

impl SessionManager {
    pub fn new(api: ApiClient, vault: TokenVault) -> Self {
        Self {
            api,
            vault,
            state: RwLock::new(SessionState::Uninitialized),
        }
    }

    /// Wire up a manager entirely from ARMOIRE_* environment variables.
    pub fn from_env() -> Self {
        let cfg = ClientConfig::from_env();
        let api = ApiClient::new(&cfg, crate::api_client::CurrentToken::new());
        let vault = TokenVault::new(make_store(&cfg));
        Self::new(api, vault)
    }

    /// The API client sharing this session's token cell; domain services
    /// should be built from clones of it.
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> SessionState {
        self.state.read().expect("state lock").clone()
    }

    /// The cached profile when authenticated.
    pub fn profile(&self) -> Option<UserProfile> {
        match &*self.state.read().expect("state lock") {
            SessionState::Authenticated(profile) => Some(profile.clone()),
            _ => None,
        }
    }

    /// True only with a proven profile and a token still in memory.
    pub fn is_authenticated(&self) -> bool {
        matches!(
            &*self.state.read().expect("state lock"),
            SessionState::Authenticated(_)
        ) && self.api.current_token().is_set()
    }

    /// Case-sensitive role membership check against the cached profile.
    pub fn has_role(&self, role: &str) -> bool {
        match &*self.state.read().expect("state lock") {
            SessionState::Authenticated(profile) => profile.roles.iter().any(|r| r == role),
            _ => false,
        }
    }

    /// Startup recovery. Tries the vault (ephemeral scope first), proves any
    /// recovered token against the profile endpoint, and always finishes in
    /// `Anonymous` or `Authenticated`. Stored records are left untouched even
    /// when proof fails, so a transient outage does not log the device out.
    pub async fn bootstrap(&self) -> SessionState {
        self.set_state(SessionState::Bootstrapping);

        let Some(token) = self.vault.load(StorageScope::Ephemeral).await else {
            debug!("No stored token; starting anonymous");
            self.set_state(SessionState::Anonymous);
            return SessionState::Anonymous;
        };

        self.api.current_token().set(Some(token));
        match self.fetch_profile().await {
            Ok(profile) => {
                info!(user = %profile.id, "Session restored from stored token");
                let state = SessionState::Authenticated(profile);
                self.set_state(state.clone());
                state
            }
            Err(e) => {
                warn!(error = %e, "Stored token did not prove a session");
                self.api.current_token().set(None);
                self.set_state(SessionState::Anonymous);
                SessionState::Anonymous
            }
        }
    }

    /// Password-grant login. On success the token is live in memory, stored
    /// encrypted under `persist`, and the profile is cached.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        persist: StorageScope,
    ) -> Result<UserProfile, AuthError> {
        let form = vec![
            ("username".to_string(), username.to_string()),
            ("password".to_string(), password.to_string()),
            ("grant_type".to_string(), "password".to_string()),
            ("scope".to_string(), String::new()),
        ];

        let body = match self.api.call(Method::POST, LOGIN_PATH, RequestCall::form(form)).await {
            Ok(body) => body,
            Err(ApiError::Status { status, body }) => {
                let message = ApiError::Status { status, body }.message();
                return Err(AuthError::InvalidCredentials { status, message });
            }
            Err(e) => return Err(AuthError::Api(e)),
        };

        let token_resp: TokenResponse = body
            .into_json()
            .map_err(|_| AuthError::MalformedTokenResponse)?;
        let token = token_resp
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MalformedTokenResponse)?;

        self.api.current_token().set(Some(token.clone()));
        self.vault.store(&token, persist).await?;

        let profile = self.fetch_profile().await?;
        info!(user = %profile.id, persist = %persist, "Session authenticated");
        self.set_state(SessionState::Authenticated(profile.clone()));
        Ok(profile)
    }

    /// Tell the backend, then clear local state regardless of its answer.
    pub async fn logout(&self) {
        if let Err(e) = self
            .api
            .call(Method::POST, LOGOUT_PATH, RequestCall::empty())
            .await
        {
            warn!(error = %e, "Logout endpoint failed; clearing local session anyway");
        }

        self.api.current_token().set(None);
        self.vault.clear().await;
        self.set_state(SessionState::Anonymous);
        info!("Session cleared");
    }

    /// `logout` plus destruction of this device's encryption keys.
    pub async fn forget_device(&self) {
        self.logout().await;
        self.vault.forget_device().await;
        info!("Device encryption keys destroyed");
    }

    async fn fetch_profile(&self) -> Result<UserProfile, ApiError> {
        let body = self
            .api
            .call(Method::GET, ME_PATH, RequestCall::empty())
            .await?;
        body.into_json::<UserProfile>()
    }

    fn set_state(&self, state: SessionState) {
        *self.state.write().expect("state lock") = state;
    }
}
