//! Scripted stand-ins for the authority and credential stores
//!
//! Both mocks record what they were asked to do so tests can assert on call
//! order and counts.

#![allow(clippy::missing_errors_doc)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Duration as ChronoDuration;
use courier_domain::{CacheKey, Credential, RoleHop};
use parking_lot::Mutex;

use crate::auth::{AuthError, AuthorityClientTrait, CredentialStoreTrait};
use crate::resilience::{Clock, SharedClock, SystemClock};

/// In-memory authority.
///
/// Every successful exchange issues `mock-<n>` with refresh token
/// `refresh-<n>`, numbered in issue order. Calls are recorded as
/// `password:<user>`, `api_key:<key id>`, `code`, `refresh` and
/// `assume:<role>`.
pub struct MockAuthority {
    clock: SharedClock,
    lifetime_secs: i64,
    delay: Duration,
    issued: AtomicU64,
    calls: Mutex<Vec<String>>,
    assume_callers: Mutex<Vec<String>>,
    failing_roles: HashMap<String, u16>,
    failing_grants: HashMap<&'static str, u16>,
}

impl MockAuthority {
    /// Authority issuing one-hour credentials on `clock`.
    pub fn new(clock: impl Clock) -> Self {
        Self {
            clock: Arc::new(clock),
            lifetime_secs: 3600,
            delay: Duration::ZERO,
            issued: AtomicU64::new(0),
            calls: Mutex::new(Vec::new()),
            assume_callers: Mutex::new(Vec::new()),
            failing_roles: HashMap::new(),
            failing_grants: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_lifetime_secs(mut self, secs: i64) -> Self {
        self.lifetime_secs = secs;
        self
    }

    /// Sleep before answering, to widen race windows.
    #[must_use]
    pub fn with_delay_ms(mut self, millis: u64) -> Self {
        self.delay = Duration::from_millis(millis);
        self
    }

    /// Reject `assume_role` for `role` with `status`.
    #[must_use]
    pub fn fail_role(mut self, role: impl Into<String>, status: u16) -> Self {
        self.failing_roles.insert(role.into(), status);
        self
    }

    /// Reject a grant (`password`, `api_key`, `code`, `refresh`) with
    /// `status`.
    #[must_use]
    pub fn fail_grant(mut self, grant: &'static str, status: u16) -> Self {
        self.failing_grants.insert(grant, status);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Access tokens presented to `assume_role`, in order.
    pub fn assume_callers(&self) -> Vec<String> {
        self.assume_callers.lock().clone()
    }

    async fn answer(&self, grant: &'static str, call: String) -> Result<Credential, AuthError> {
        self.calls.lock().push(call);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let Some(status) = self.failing_grants.get(grant) {
            return Err(rejected(grant, *status));
        }
        Ok(self.issue())
    }

    fn issue(&self) -> Credential {
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let expires_at = self.clock.utc_now() + ChronoDuration::seconds(self.lifetime_secs);
        Credential::new(format!("mock-{n}"), expires_at).with_refresh_token(format!("refresh-{n}"))
    }
}

impl Default for MockAuthority {
    fn default() -> Self {
        Self::new(SystemClock)
    }
}

fn rejected(grant: &'static str, status: u16) -> AuthError {
    AuthError::Rejected { grant, status, message: "rejected by mock authority".to_string() }
}

#[async_trait]
impl AuthorityClientTrait for MockAuthority {
    async fn password_grant(
        &self,
        username: &str,
        _password: &str,
    ) -> Result<Credential, AuthError> {
        self.answer("password", format!("password:{username}")).await
    }

    async fn api_key_grant(&self, key_id: &str, _secret: &str) -> Result<Credential, AuthError> {
        self.answer("api_key", format!("api_key:{key_id}")).await
    }

    async fn exchange_code(&self, _code: &str, _state: &str) -> Result<Credential, AuthError> {
        self.answer("code", "code".to_string()).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Credential, AuthError> {
        if refresh_token.is_empty() {
            return Err(AuthError::NoRefreshToken);
        }
        self.answer("refresh", "refresh".to_string()).await
    }

    async fn assume_role(
        &self,
        caller: &Credential,
        hop: &RoleHop,
        session_name: &str,
    ) -> Result<Credential, AuthError> {
        self.assume_callers.lock().push(caller.access_token.clone());
        self.calls.lock().push(format!("assume:{}", hop.role_name));
        if let Some(status) = self.failing_roles.get(&hop.role_name) {
            return Err(rejected("assume_role", *status));
        }
        Ok(self.issue().with_session_name(session_name))
    }
}

/// In-memory credential store.
#[derive(Debug, Default)]
pub struct MockCredentialStore {
    entries: Mutex<HashMap<CacheKey, Credential>>,
    fail_writes: bool,
}

impl MockCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store whose writes always fail.
    pub fn failing() -> Self {
        Self { fail_writes: true, ..Self::default() }
    }

    pub fn insert(&self, key: CacheKey, credential: Credential) {
        self.entries.lock().insert(key, credential);
    }

    pub fn get(&self, key: &CacheKey) -> Option<Credential> {
        self.entries.lock().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CredentialStoreTrait for MockCredentialStore {
    async fn store(&self, key: &CacheKey, credential: &Credential) -> Result<(), AuthError> {
        if self.fail_writes {
            return Err(AuthError::store("mock store refuses writes"));
        }
        self.insert(key.clone(), credential.clone());
        Ok(())
    }

    async fn retrieve(&self, key: &CacheKey) -> Result<Option<Credential>, AuthError> {
        Ok(self.get(key))
    }

    async fn delete(&self, key: &CacheKey) -> Result<(), AuthError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Validates issued tokens are numbered and the call log is kept.
    #[tokio::test]
    async fn mock_authority_numbers_tokens() {
        let authority = MockAuthority::default();
        let first = authority.password_grant("Admin", "pw").await.expect("issues");
        let second = authority.refresh("refresh-1").await.expect("issues");

        assert_eq!(first.access_token, "mock-1");
        assert_eq!(second.access_token, "mock-2");
        assert_eq!(second.refresh_token.as_deref(), Some("refresh-2"));
        assert_eq!(authority.calls(), vec!["password:Admin", "refresh"]);
    }

    #[tokio::test]
    async fn failing_grant_is_rejected() {
        let authority = MockAuthority::default().fail_grant("password", 401);
        let err = authority.password_grant("Admin", "pw").await.expect_err("rejected");
        assert_eq!(err.status(), Some(401));
        assert_eq!(authority.call_count(), 1);
    }

    #[tokio::test]
    async fn failing_store_refuses_writes() {
        let store = MockCredentialStore::failing();
        let key = CacheKey::new("a", "r", "s");
        assert!(store.store(&key, &Credential::with_lifetime("t", 60)).await.is_err());
        assert!(!store.has(&key).await);
    }
}
