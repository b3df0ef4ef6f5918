//! Persisted session state: access token, refresh token and cached profile.
//!
//! A session exists iff an access token is stored. The store is an injected
//! object; the composition root decides which `KeyValueStore` backs it.

use std::sync::Arc;

use crate::storage::KeyValueStore;
use crate::types::UserProfile;

pub const ACCESS_TOKEN_KEY: &str = "petconnect_token";
pub const REFRESH_TOKEN_KEY: &str = "petconnect_refresh_token";
pub const USER_KEY: &str = "petconnect_user";

/// Sentinel access token issued to the demo account. It is never refreshed.
pub const DEMO_ACCESS_TOKEN: &str = "token-teste-petconnect";
pub const DEMO_REFRESH_TOKEN: &str = "refresh-teste-petconnect";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub user: Option<UserProfile>,
}

impl Session {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            user: None,
        }
    }

    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    pub fn with_user(mut self, user: UserProfile) -> Self {
        self.user = Some(user);
        self
    }

    /// Whether this is the demo account's session, served by the mock store.
    pub fn is_demo(&self) -> bool {
        self.access_token == DEMO_ACCESS_TOKEN
    }
}

#[derive(Clone)]
pub struct TokenStore {
    storage: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("authenticated", &self.access_token().is_some())
            .finish()
    }
}

impl TokenStore {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self { storage }
    }

    /// Write every field present in `session`. Absent optional fields keep
    /// their stored value.
    pub fn save(&self, session: &Session) {
        self.storage.set(ACCESS_TOKEN_KEY, &session.access_token);
        if let Some(refresh) = &session.refresh_token {
            self.storage.set(REFRESH_TOKEN_KEY, refresh);
        }
        if let Some(user) = &session.user {
            match serde_json::to_string(user) {
                Ok(json) => self.storage.set(USER_KEY, &json),
                Err(e) => tracing::warn!(error = %e, "failed to serialize user profile"),
            }
        }
    }

    pub fn read(&self) -> Option<Session> {
        Some(Session {
            access_token: self.access_token()?,
            refresh_token: self.refresh_token(),
            user: self.user(),
        })
    }

    pub fn clear(&self) {
        self.storage.remove(ACCESS_TOKEN_KEY);
        self.storage.remove(REFRESH_TOKEN_KEY);
        self.storage.remove(USER_KEY);
    }

    pub fn access_token(&self) -> Option<String> {
        self.storage.get(ACCESS_TOKEN_KEY)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.storage.get(REFRESH_TOKEN_KEY)
    }

    /// Cached profile. An unreadable entry is treated as absent.
    pub fn user(&self) -> Option<UserProfile> {
        let raw = self.storage.get(USER_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unreadable cached user profile");
                None
            }
        }
    }

    pub fn set_access_token(&self, token: &str) {
        self.storage.set(ACCESS_TOKEN_KEY, token);
    }

    pub fn set_refresh_token(&self, token: &str) {
        self.storage.set(REFRESH_TOKEN_KEY, token);
    }

    pub fn clear_access_token(&self) {
        self.storage.remove(ACCESS_TOKEN_KEY);
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token().is_some()
    }

    pub fn is_demo(&self) -> bool {
        self.access_token().as_deref() == Some(DEMO_ACCESS_TOKEN)
    }
}
