//! Platform keychain credential store via `keyring`

use async_trait::async_trait;
use courier_domain::constants::DEFAULT_KEYCHAIN_SERVICE;
use courier_domain::{CacheKey, Credential};
use keyring::Entry;
use tracing::debug;

use crate::auth::error::AuthError;
use crate::auth::traits::CredentialStoreTrait;

/// Stores each credential as a JSON secret under `service`, with the cache
/// key as the account name.
#[derive(Debug, Clone)]
pub struct KeychainCredentialStore {
    service: String,
}

impl KeychainCredentialStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self { service: service.into() }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    fn entry(&self, key: &CacheKey) -> Result<Entry, AuthError> {
        Entry::new(&self.service, &key.to_string())
            .map_err(|e| AuthError::store(format!("keychain entry for {key}: {e}")))
    }
}

impl Default for KeychainCredentialStore {
    fn default() -> Self {
        Self::new(DEFAULT_KEYCHAIN_SERVICE)
    }
}

#[async_trait]
impl CredentialStoreTrait for KeychainCredentialStore {
    async fn store(&self, key: &CacheKey, credential: &Credential) -> Result<(), AuthError> {
        let secret = serde_json::to_string(credential)
            .map_err(|e| AuthError::store(format!("serialize credential: {e}")))?;
        self.entry(key)?
            .set_password(&secret)
            .map_err(|e| AuthError::store(format!("keychain write for {key}: {e}")))?;
        debug!(service = %self.service, cache_key = %key, "Credential stored in keychain");
        Ok(())
    }

    async fn retrieve(&self, key: &CacheKey) -> Result<Option<Credential>, AuthError> {
        match self.entry(key)?.get_password() {
            Ok(secret) => serde_json::from_str(&secret)
                .map(Some)
                .map_err(|e| AuthError::store(format!("corrupt keychain entry for {key}: {e}"))),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(AuthError::store(format!("keychain read for {key}: {e}"))),
        }
    }

    async fn delete(&self, key: &CacheKey) -> Result<(), AuthError> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(AuthError::store(format!("keychain delete for {key}: {e}"))),
        }
    }
}
