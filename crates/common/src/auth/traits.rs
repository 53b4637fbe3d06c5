//! Seams for the remote authority and credential persistence
//!
//! Both are trait objects so the credential manager can run against mocks in
//! tests and against different backends in production.

use async_trait::async_trait;
use courier_domain::{CacheKey, Credential, RoleHop};

use super::error::AuthError;

/// Remote authority that exchanges secrets for credentials.
#[async_trait]
pub trait AuthorityClientTrait: Send + Sync {
    /// Resource-owner password grant.
    async fn password_grant(&self, username: &str, password: &str)
        -> Result<Credential, AuthError>;

    /// Exchange an API key id/secret pair for a credential.
    async fn api_key_grant(&self, key_id: &str, secret: &str) -> Result<Credential, AuthError>;

    /// Exchange an authorization code; `state` must match the pending
    /// authorization request.
    async fn exchange_code(&self, code: &str, state: &str) -> Result<Credential, AuthError>;

    async fn refresh(&self, refresh_token: &str) -> Result<Credential, AuthError>;

    /// Assume `hop` while acting as `caller`.
    async fn assume_role(
        &self,
        caller: &Credential,
        hop: &RoleHop,
        session_name: &str,
    ) -> Result<Credential, AuthError>;
}

/// Durable storage for credentials, keyed by cache key.
#[async_trait]
pub trait CredentialStoreTrait: Send + Sync {
    async fn store(&self, key: &CacheKey, credential: &Credential) -> Result<(), AuthError>;

    /// `Ok(None)` when nothing is stored for `key`.
    async fn retrieve(&self, key: &CacheKey) -> Result<Option<Credential>, AuthError>;

    /// Idempotent.
    async fn delete(&self, key: &CacheKey) -> Result<(), AuthError>;

    async fn has(&self, key: &CacheKey) -> bool {
        matches!(self.retrieve(key).await, Ok(Some(_)))
    }
}
