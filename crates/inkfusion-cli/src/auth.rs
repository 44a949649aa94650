//! Keychain-backed token storage for CLI profiles.

#[cfg(test)]
use std::collections::HashMap;
#[cfg(test)]
use std::sync::{Mutex, OnceLock};

#[cfg(not(test))]
use keyring::Entry;

use inkfusion_core::session::{AuthToken, Session, SessionError, SessionResult, TokenStore};

#[cfg(not(test))]
const KEYRING_SERVICE_NAME: &str = "inkfusion";

/// One keychain entry per profile.
#[derive(Debug, Clone)]
pub struct KeyringTokenStore {
    username: String,
}

impl KeyringTokenStore {
    pub fn new(profile_name: &str) -> Self {
        Self {
            username: format!("auth-token:{profile_name}"),
        }
    }

    #[cfg(test)]
    fn test_store() -> &'static Mutex<HashMap<String, String>> {
        static STORE: OnceLock<Mutex<HashMap<String, String>>> = OnceLock::new();
        STORE.get_or_init(|| Mutex::new(HashMap::new()))
    }

    #[cfg(not(test))]
    fn entry(&self) -> SessionResult<Entry> {
        Entry::new(KEYRING_SERVICE_NAME, &self.username)
            .map_err(|error| SessionError::SecureStorage(error.to_string()))
    }
}

impl TokenStore for KeyringTokenStore {
    #[cfg(not(test))]
    fn load_token(&self) -> SessionResult<Option<AuthToken>> {
        match self.entry()?.get_password() {
            Ok(raw) => AuthToken::new(raw).map(Some),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(error) => Err(SessionError::SecureStorage(error.to_string())),
        }
    }

    #[cfg(test)]
    fn load_token(&self) -> SessionResult<Option<AuthToken>> {
        let guard = Self::test_store()
            .lock()
            .map_err(|error| SessionError::SecureStorage(error.to_string()))?;
        guard.get(&self.username).cloned().map(AuthToken::new).transpose()
    }

    #[cfg(not(test))]
    fn save_token(&self, token: &AuthToken) -> SessionResult<()> {
        self.entry()?
            .set_password(token.expose())
            .map_err(|error| SessionError::SecureStorage(error.to_string()))
    }

    #[cfg(test)]
    fn save_token(&self, token: &AuthToken) -> SessionResult<()> {
        let mut guard = Self::test_store()
            .lock()
            .map_err(|error| SessionError::SecureStorage(error.to_string()))?;
        guard.insert(self.username.clone(), token.expose().to_string());
        Ok(())
    }

    #[cfg(not(test))]
    fn clear_token(&self) -> SessionResult<()> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(error) => Err(SessionError::SecureStorage(error.to_string())),
        }
    }

    #[cfg(test)]
    fn clear_token(&self) -> SessionResult<()> {
        let mut guard = Self::test_store()
            .lock()
            .map_err(|error| SessionError::SecureStorage(error.to_string()))?;
        guard.remove(&self.username);
        Ok(())
    }
}

pub fn session_for_profile(profile_name: &str) -> Session<KeyringTokenStore> {
    Session::new(KeyringTokenStore::new(profile_name))
}
