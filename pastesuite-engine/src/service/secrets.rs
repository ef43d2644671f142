//! Secret storage
//!
//! Connections only carry a reference to their secret; the value itself
//! lives in the platform keyring, keyed by connection id and category.

use pastesuite_core::domain::ids::ConnectionId;
use std::collections::HashMap;
use std::sync::RwLock;
use thiserror::Error;
use tracing::trace;

/// Category under which provider API keys are stored
pub const API_KEY: &str = "api_key";

const KEYRING_SERVICE: &str = "PasteSuiteAI";

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("secret store lock poisoned")]
    Poisoned,
}

pub trait SecretStore: Send + Sync {
    fn read(&self, connection_id: &ConnectionId, category: &str) -> Result<Option<String>, SecretError>;

    fn save(&self, connection_id: &ConnectionId, category: &str, value: &str) -> Result<(), SecretError>;

    /// Removes a secret; returns false if there was none
    fn delete(&self, connection_id: &ConnectionId, category: &str) -> Result<bool, SecretError>;
}

/// Secrets kept in the OS keyring (Secret Service, Keychain, Credential Manager)
#[derive(Debug, Clone)]
pub struct KeyringSecretStore {
    service: String,
}

impl KeyringSecretStore {
    pub fn new() -> Self {
        Self::with_service(KEYRING_SERVICE)
    }

    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, connection_id: &ConnectionId, category: &str) -> Result<keyring::Entry, SecretError> {
        Ok(keyring::Entry::new(&self.service, &account(connection_id, category))?)
    }
}

impl Default for KeyringSecretStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SecretStore for KeyringSecretStore {
    fn read(&self, connection_id: &ConnectionId, category: &str) -> Result<Option<String>, SecretError> {
        trace!("keyring read, connection={}, category={}", connection_id, category);
        match self.entry(connection_id, category)?.get_password() {
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, connection_id: &ConnectionId, category: &str, value: &str) -> Result<(), SecretError> {
        trace!(
            "keyring save, connection={}, category={}, value_len={}",
            connection_id,
            category,
            value.len()
        );
        self.entry(connection_id, category)?.set_password(value)?;
        Ok(())
    }

    fn delete(&self, connection_id: &ConnectionId, category: &str) -> Result<bool, SecretError> {
        trace!("keyring delete, connection={}, category={}", connection_id, category);
        match self.entry(connection_id, category)?.delete_credential() {
            Ok(()) => Ok(true),
            Err(keyring::Error::NoEntry) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

fn account(connection_id: &ConnectionId, category: &str) -> String {
    format!("{}::{}", connection_id, category)
}

/// Process-local store for tests and keyring-less environments
#[derive(Debug, Default)]
pub struct InMemorySecretStore {
    secrets: RwLock<HashMap<String, String>>,
}

impl InMemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder helper that stores an API key
    pub fn with_api_key(self, connection_id: &ConnectionId, value: &str) -> Self {
        if let Ok(mut secrets) = self.secrets.write() {
            secrets.insert(account(connection_id, API_KEY), value.to_string());
        }
        self
    }
}

impl SecretStore for InMemorySecretStore {
    fn read(&self, connection_id: &ConnectionId, category: &str) -> Result<Option<String>, SecretError> {
        let secrets = self.secrets.read().map_err(|_| SecretError::Poisoned)?;
        Ok(secrets.get(&account(connection_id, category)).cloned())
    }

    fn save(&self, connection_id: &ConnectionId, category: &str, value: &str) -> Result<(), SecretError> {
        let mut secrets = self.secrets.write().map_err(|_| SecretError::Poisoned)?;
        secrets.insert(account(connection_id, category), value.to_string());
        Ok(())
    }

    fn delete(&self, connection_id: &ConnectionId, category: &str) -> Result<bool, SecretError> {
        let mut secrets = self.secrets.write().map_err(|_| SecretError::Poisoned)?;
        Ok(secrets.remove(&account(connection_id, category)).is_some())
    }
}
