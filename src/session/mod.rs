//! Auth session lifecycle
//!
//! Owns login, registration, logout and profile caching on top of
//! [`ApiClient`], and keeps the persisted [`TokenStore`] consistent with the
//! in-memory state the app reads.

mod errors;

pub use errors::{AuthFailure, AuthOutcome};

use crate::api::client::{ApiClient, ApiError, LOGIN_ENDPOINT, REGISTER_ENDPOINT};
use crate::api::{jwt, AuthPayload, TokenPair, UserRecord};
use crate::storage::{StorageError, TokenStore};
use serde::Serialize;
use serde_json::Value;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;

pub const PROFILE_DETAIL_ENDPOINT: &str = "/auth/profile/detail/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Persisted state not loaded yet.
    Unknown,
    Authenticated,
    Anonymous,
}

/// Where the app should go after a successful sign-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NextScreen {
    Onboarding,
    Dashboard,
}

/// Point-in-time view of the session.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Session {
    pub user: Option<UserRecord>,
    pub tokens: Option<TokenPair>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some() && self.tokens.is_some()
    }
}

#[derive(Debug)]
enum SessionState {
    Unknown,
    Authenticated { user: UserRecord },
    Anonymous,
}

#[derive(Error, Debug)]
enum RestoreError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Token validation error: {0}")]
    Token(#[from] jwt::JwtError),
    #[error("Token refresh failed: {0}")]
    Refresh(#[from] ApiError),
}

/// The session object the app root owns and hands to screens.
///
/// Persisted tokens are the source of truth for the token half: the user
/// record lives here, the pair is read from the store. A session whose
/// tokens were wiped underneath it (a failed refresh inside the client)
/// settles into `Anonymous` on the next read.
pub struct AuthSession {
    client: ApiClient,
    state: RwLock<SessionState>,
}

impl AuthSession {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            state: RwLock::new(SessionState::Unknown),
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    fn store(&self) -> &TokenStore {
        self.client.store()
    }

    fn read_state(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Loads persisted state at app start. An expired access token gets one
    /// refresh attempt; any failure here wipes the persisted session.
    pub async fn initialize(&self) -> SessionStatus {
        self.initialize_at(chrono::Utc::now().timestamp()).await
    }

    pub async fn initialize_at(&self, now_secs: i64) -> SessionStatus {
        match self.restore(now_secs).await {
            Ok(Some(user)) => {
                *self.write_state() = SessionState::Authenticated { user };
                log::info!("Restored authenticated session");
            }
            Ok(None) => {
                *self.write_state() = SessionState::Anonymous;
                log::info!("No stored session");
            }
            Err(e) => {
                log::warn!("{}, clearing auth state", e);
                self.clear_auth_state();
            }
        }
        self.status()
    }

    async fn restore(&self, now_secs: i64) -> Result<Option<UserRecord>, RestoreError> {
        let (tokens, user) = match (self.store().load_tokens()?, self.store().load_user()?) {
            (Some(tokens), Some(user)) => (tokens, user),
            _ => return Ok(None),
        };

        if jwt::is_expired(&tokens.access, now_secs)? {
            log::info!("Stored access token expired, attempting refresh");
            self.client.refresh_token().await?;
        }
        Ok(Some(user))
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<NextScreen, AuthFailure> {
        self.clear_auth_state();

        let credentials = serde_json::json!({ "email": email, "password": password });
        let data = self
            .client
            .post(LOGIN_ENDPOINT, &credentials)
            .await
            .map_err(|e| {
                log::error!("Login error: {}", e);
                AuthFailure::from_login_error(&e)
            })?;

        let user = self.establish(data)?;
        log::info!("Logged in");

        if user.career_interests().is_empty() {
            Ok(NextScreen::Onboarding)
        } else {
            Ok(NextScreen::Dashboard)
        }
    }

    /// New accounts always continue to onboarding.
    pub async fn register(&self, user_data: &Value) -> Result<NextScreen, AuthFailure> {
        self.clear_auth_state();

        let data = self
            .client
            .post(REGISTER_ENDPOINT, user_data)
            .await
            .map_err(|e| {
                log::error!("Registration error: {}", e);
                AuthFailure::from_register_error(&e)
            })?;

        self.establish(data)?;
        log::info!("Account created");
        Ok(NextScreen::Onboarding)
    }

    fn establish(&self, data: Value) -> Result<UserRecord, AuthFailure> {
        let payload: AuthPayload = serde_json::from_value(data)
            .map_err(|e| AuthFailure::general(format!("Unexpected response: {}", e)))?;

        let mut state = self.write_state();
        self.store()
            .save_session(&payload.tokens, &payload.user)
            .map_err(|e| AuthFailure::general(e.to_string()))?;
        *state = SessionState::Authenticated {
            user: payload.user.clone(),
        };
        Ok(payload.user)
    }

    pub fn logout(&self) {
        self.clear_auth_state();
        log::info!("Logged out");
    }

    /// Wipes persisted tokens and user, then marks the session anonymous.
    /// Storage errors are logged, never raised.
    pub fn clear_auth_state(&self) {
        let mut state = self.write_state();
        if let Err(e) = self.store().clear() {
            log::error!("Error clearing auth state: {}", e);
        }
        *state = SessionState::Anonymous;
    }

    /// Shallow-merges `partial` into the cached user record. Tokens are
    /// untouched.
    pub fn update_user(&self, partial: &Value) -> Result<(), AuthFailure> {
        let mut state = self.write_state();
        let SessionState::Authenticated { user } = &mut *state else {
            return Err(AuthFailure::general("Not signed in"));
        };

        let updated = user.merged(partial);
        self.store().save_user(&updated).map_err(|e| {
            log::error!("Error updating user: {}", e);
            AuthFailure::general(e.to_string())
        })?;
        *user = updated;
        Ok(())
    }

    /// Replaces the cached user record with the backend's current profile.
    /// An authentication error signs the user out.
    pub async fn refresh_user(&self) -> Result<(), AuthFailure> {
        let data = self.client.get(PROFILE_DETAIL_ENDPOINT).await.map_err(|e| {
            log::error!("Error refreshing user: {}", e);
            if matches!(e, ApiError::AuthenticationFailed) {
                self.clear_auth_state();
            }
            AuthFailure::general(e.to_string())
        })?;
        let user = UserRecord(data);

        let mut state = self.write_state();
        if !matches!(*state, SessionState::Authenticated { .. }) {
            return Err(AuthFailure::general("Not signed in"));
        }
        self.store()
            .save_user(&user)
            .map_err(|e| AuthFailure::general(e.to_string()))?;
        *state = SessionState::Authenticated { user };
        Ok(())
    }

    pub fn status(&self) -> SessionStatus {
        self.reconcile();
        match *self.read_state() {
            SessionState::Unknown => SessionStatus::Unknown,
            SessionState::Authenticated { .. } => SessionStatus::Authenticated,
            SessionState::Anonymous => SessionStatus::Anonymous,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.status() == SessionStatus::Unknown
    }

    pub fn is_authenticated(&self) -> bool {
        self.status() == SessionStatus::Authenticated
    }

    pub fn snapshot(&self) -> Session {
        self.reconcile();
        match &*self.read_state() {
            SessionState::Authenticated { user } => Session {
                user: Some(user.clone()),
                tokens: self.store().load_tokens().ok().flatten(),
            },
            _ => Session::default(),
        }
    }

    pub fn user(&self) -> Option<UserRecord> {
        self.snapshot().user
    }

    pub fn tokens(&self) -> Option<TokenPair> {
        self.snapshot().tokens
    }

    fn reconcile(&self) {
        if !matches!(*self.read_state(), SessionState::Authenticated { .. }) {
            return;
        }
        match self.store().load_tokens() {
            Ok(Some(_)) => {}
            Ok(None) => {
                log::info!("Stored tokens are gone, session is now anonymous");
                *self.write_state() = SessionState::Anonymous;
            }
            Err(e) => {
                log::warn!("Unreadable stored tokens ({}), clearing auth state", e);
                self.clear_auth_state();
            }
        }
    }
}
