//! Session credential storage.
//!
//! The bearer token lives in a single slot of a persistent key-value store.
//! Components that need it receive a [`Session`] instead of reading ambient
//! state.

use std::fmt;
use std::sync::{Arc, Mutex};

use thiserror::Error;

use crate::util::lock;

/// Bearer credential sent as the `auth-token` header.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    /// Wrap a raw token. Blank tokens are rejected.
    pub fn new(raw: impl Into<String>) -> SessionResult<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(SessionError::InvalidToken);
        }
        Ok(Self(trimmed.to_string()))
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("AuthToken([REDACTED])")
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Auth token must not be empty")]
    InvalidToken,
    #[error("Not signed in")]
    NotSignedIn,
    #[error("Secure storage error: {0}")]
    SecureStorage(String),
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Persistent slot holding the auth token.
pub trait TokenStore: Clone + Send + Sync + 'static {
    fn load_token(&self) -> SessionResult<Option<AuthToken>>;
    fn save_token(&self, token: &AuthToken) -> SessionResult<()>;
    fn clear_token(&self) -> SessionResult<()>;
}

/// Process-local token store, used by tests and embedders without a keychain.
#[derive(Debug, Clone, Default)]
pub struct MemoryTokenStore {
    slot: Arc<Mutex<Option<AuthToken>>>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds a token.
    pub fn with_token(raw: impl Into<String>) -> SessionResult<Self> {
        let store = Self::new();
        store.save_token(&AuthToken::new(raw)?)?;
        Ok(store)
    }
}

impl TokenStore for MemoryTokenStore {
    fn load_token(&self) -> SessionResult<Option<AuthToken>> {
        Ok(lock(&self.slot).clone())
    }

    fn save_token(&self, token: &AuthToken) -> SessionResult<()> {
        *lock(&self.slot) = Some(token.clone());
        Ok(())
    }

    fn clear_token(&self) -> SessionResult<()> {
        *lock(&self.slot) = None;
        Ok(())
    }
}

/// Explicit handle to the signed-in credential.
///
/// The token is read from the store on every call, so a login or logout
/// through any clone is visible to all of them.
#[derive(Clone)]
pub struct Session<S: TokenStore> {
    store: S,
}

impl<S: TokenStore> Session<S> {
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    pub fn token(&self) -> SessionResult<Option<AuthToken>> {
        self.store.load_token()
    }

    /// The stored token, or [`SessionError::NotSignedIn`].
    pub fn require_token(&self) -> SessionResult<AuthToken> {
        self.store.load_token()?.ok_or(SessionError::NotSignedIn)
    }

    /// Whether a token is present. Storage failures count as signed out.
    pub fn is_authenticated(&self) -> bool {
        match self.store.load_token() {
            Ok(token) => token.is_some(),
            Err(error) => {
                tracing::warn!("Failed to read stored auth token: {}", error);
                false
            }
        }
    }

    pub fn sign_in(&self, token: &AuthToken) -> SessionResult<()> {
        self.store.save_token(token)
    }

    pub fn sign_out(&self) -> SessionResult<()> {
        self.store.clear_token()
    }
}

impl<S: TokenStore> fmt::Debug for Session<S> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Session")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}
