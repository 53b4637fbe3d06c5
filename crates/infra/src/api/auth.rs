//! Credential providers for the request executor
//!
//! The executor never talks to the authority directly. It asks an
//! [`AccessTokenProvider`] for a credential before each attempt and for a
//! replacement after a 401.

use std::sync::Arc;

use async_trait::async_trait;
use courier_common::auth::{AuthError, CredentialManager};
use courier_domain::{Credential, IdentityContext};
use tracing::debug;

/// Trait for providing access tokens
///
/// This trait allows dependency injection and testing with mock providers.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    /// A credential valid right now.
    async fn credential(&self) -> Result<Credential, AuthError>;

    /// Replace the current credential after the server rejected it.
    async fn refresh(&self) -> Result<Credential, AuthError>;
}

/// Provider backed by a [`CredentialManager`] for one identity.
pub struct ManagedCredentialProvider {
    manager: Arc<CredentialManager>,
    context: IdentityContext,
}

impl ManagedCredentialProvider {
    pub fn new(manager: Arc<CredentialManager>, context: IdentityContext) -> Self {
        Self { manager, context }
    }

    pub fn context(&self) -> &IdentityContext {
        &self.context
    }
}

#[async_trait]
impl AccessTokenProvider for ManagedCredentialProvider {
    async fn credential(&self) -> Result<Credential, AuthError> {
        self.manager.get_or_refresh(&self.context).await
    }

    async fn refresh(&self) -> Result<Credential, AuthError> {
        debug!(cache_key = %self.context.cache_key(), "Server rejected credential, refreshing");
        self.manager.force_refresh(&self.context).await
    }
}

/// Provider that always hands out the same credential.
///
/// Refreshing is impossible, so a 401 surfaces as a fatal failure.
#[derive(Debug, Clone)]
pub struct StaticCredentialProvider {
    credential: Credential,
}

impl StaticCredentialProvider {
    pub fn new(credential: Credential) -> Self {
        Self { credential }
    }
}

#[async_trait]
impl AccessTokenProvider for StaticCredentialProvider {
    async fn credential(&self) -> Result<Credential, AuthError> {
        if self.credential.is_expired() {
            return Err(AuthError::ExpiredOnArrival { expired_at: self.credential.expires_at });
        }
        Ok(self.credential.clone())
    }

    async fn refresh(&self) -> Result<Credential, AuthError> {
        Err(AuthError::NoRefreshToken)
    }
}
