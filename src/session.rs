// src/session.rs
//! Admin session: a single bearer token, persisted across restarts.
//!
//! The token's presence is the only authority gate for admin views. It is
//! restored without server validation; a stale token surfaces lazily as a
//! 401 on the first authenticated call, which invalidates the session.

use std::fmt;
use std::sync::{Arc, RwLock};

use metrics::counter;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::storage::{KeyValueStore, TOKEN_KEY};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticated,
}

#[derive(Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Rejects obviously malformed input before anything goes on the wire.
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.username.trim().is_empty() {
            return Err(AuthError::Validation("username is required".into()));
        }
        if self.password.is_empty() {
            return Err(AuthError::Validation("password is required".into()));
        }
        Ok(())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid login input: {0}")]
    Validation(String),
    #[error("credentials rejected (status {status})")]
    InvalidCredentials { status: u16 },
    #[error("login request failed: {0}")]
    Network(String),
    #[error("login response malformed: {0}")]
    MalformedResponse(String),
}

impl AuthError {
    /// Both local input checks and server-side rejection are user-facing
    /// validation failures; the session is untouched either way.
    pub fn is_validation_failure(&self) -> bool {
        matches!(
            self,
            AuthError::Validation(_) | AuthError::InvalidCredentials { .. }
        )
    }
}

/// Short SHA-256 fingerprint so logs can correlate tokens without leaking them.
pub(crate) fn token_fingerprint(token: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(token.as_bytes());
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

pub struct SessionStore {
    storage: Arc<dyn KeyValueStore>,
    token: RwLock<Option<String>>,
    state_tx: watch::Sender<SessionState>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Anonymous);
        Self {
            storage,
            token: RwLock::new(None),
            state_tx,
        }
    }

    /// Reads a persisted token, if any, and trusts it as-is.
    pub fn restore(&self) -> SessionState {
        match self.storage.get(TOKEN_KEY).filter(|t| !t.is_empty()) {
            Some(token) => {
                info!(target: "session", fp = %token_fingerprint(&token), "restored persisted session");
                self.set_token(Some(token));
            }
            None => {
                self.set_token(None);
            }
        }
        self.state()
    }

    /// Records a freshly issued token. A storage failure only costs
    /// persistence; the in-process session is still established.
    pub fn establish(&self, token: String) {
        if let Err(e) = self.storage.set(TOKEN_KEY, &token) {
            warn!(target: "session", error = ?e, "failed to persist session token");
        }
        info!(target: "session", fp = %token_fingerprint(&token), "session established");
        self.set_token(Some(token));
    }

    /// Clears the token in memory and on disk. Returns `true` only when this
    /// call performed the Authenticated -> Anonymous transition.
    pub fn logout(&self) -> bool {
        if let Err(e) = self.storage.remove(TOKEN_KEY) {
            warn!(target: "session", error = ?e, "failed to clear persisted token");
        }
        let was_authenticated = self.set_token(None);
        if was_authenticated {
            info!(target: "session", "session cleared");
        }
        was_authenticated
    }

    /// Automatic invalidation path: an authenticated call was denied.
    pub fn invalidate(&self) -> bool {
        let transitioned = self.logout();
        if transitioned {
            counter!("session_invalidations_total").increment(1);
            warn!(target: "session", "authorization denied, session invalidated");
        }
        transitioned
    }

    pub fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    pub fn state(&self) -> SessionState {
        *self.state_tx.borrow()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state() == SessionState::Authenticated
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    /// Returns whether the session was authenticated before the swap. The
    /// published state changes under the token write guard, so readers never
    /// see one without the other.
    fn set_token(&self, token: Option<String>) -> bool {
        let next = if token.is_some() {
            SessionState::Authenticated
        } else {
            SessionState::Anonymous
        };
        let mut g = self.token.write().unwrap_or_else(|p| p.into_inner());
        let previous = g.is_some();
        *g = token;
        self.state_tx.send_if_modified(|s| {
            if *s == next {
                false
            } else {
                *s = next;
                true
            }
        });
        previous
    }
}
