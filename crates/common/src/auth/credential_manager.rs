//! Credential lifecycle
//!
//! [`CredentialManager`] turns an [`IdentityContext`] into a currently valid
//! [`Credential`]:
//! - authenticates with the context's method (password, API key, code,
//!   refresh token, or a role chain on top of any of these)
//! - serves repeat requests from the [`CredentialCache`]
//! - refreshes in place with the refresh token when near expiry, falling
//!   back to a full exchange
//! - writes every new credential through to an optional durable store
//! - can keep one context warm in the background

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use courier_domain::constants::DEFAULT_REFRESH_THRESHOLD_SECS;
use courier_domain::{AuthMethod, CacheKey, Credential, IdentityContext};
use dashmap::DashMap;
use futures::future::BoxFuture;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::credential_cache::CredentialCache;
use super::error::AuthError;
use super::traits::{AuthorityClientTrait, CredentialStoreTrait};

/// Delay before the auto-refresh loop looks again after a failure or when
/// nothing is cached.
const AUTO_REFRESH_RETRY: Duration = Duration::from_secs(60);

/// Floor for the auto-refresh sleep between successful refreshes.
const AUTO_REFRESH_MIN_WAIT: Duration = Duration::from_secs(1);

/// Produces valid credentials for identity contexts.
///
/// Concurrent callers asking for the same cache key are serialized so only
/// one of them talks to the authority; the rest observe the cached result.
pub struct CredentialManager {
    authority: Arc<dyn AuthorityClientTrait>,
    cache: CredentialCache,
    store: Option<Arc<dyn CredentialStoreTrait>>,
    refresh_threshold_secs: i64,
    inflight: DashMap<CacheKey, Arc<Mutex<()>>>,
}

impl CredentialManager {
    pub fn new(authority: Arc<dyn AuthorityClientTrait>, cache: CredentialCache) -> Self {
        Self {
            authority,
            cache,
            store: None,
            refresh_threshold_secs: DEFAULT_REFRESH_THRESHOLD_SECS,
            inflight: DashMap::new(),
        }
    }

    /// Persist every new credential to `store`.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn CredentialStoreTrait>) -> Self {
        self.store = Some(store);
        self
    }

    /// Treat credentials expiring within `secs` as due for refresh.
    ///
    /// The window is capped at half of each credential's lifetime, so short
    /// lived credentials are still served from cache for a while.
    #[must_use]
    pub fn with_refresh_threshold(mut self, secs: i64) -> Self {
        self.refresh_threshold_secs = secs.max(0);
        self
    }

    pub fn cache(&self) -> &CredentialCache {
        &self.cache
    }

    pub fn refresh_threshold(&self) -> i64 {
        self.refresh_threshold_secs
    }

    /// Exchange the context's long-lived secret for a fresh credential.
    ///
    /// Always contacts the authority. The result is cached under the
    /// context's cache key and written to the store.
    ///
    /// # Errors
    /// Any [`AuthError`] from the exchange; for role chains the first failing
    /// hop is reported as [`AuthError::HopFailed`] and later hops are skipped.
    pub async fn authenticate(&self, context: &IdentityContext) -> Result<Credential, AuthError> {
        let key = context.cache_key();
        info!(cache_key = %key, method = context.method.label(), "Authenticating");

        let mut credential = self.exchange(&context.method, &context.session_name).await?;
        self.ensure_live(&credential)?;
        credential.session_name.get_or_insert_with(|| context.session_name.clone());
        self.remember(key, &credential).await;
        Ok(credential)
    }

    /// Return a cached credential, refreshing or re-authenticating if needed.
    ///
    /// Never returns a credential whose `expires_at` has passed.
    pub async fn get_or_refresh(&self, context: &IdentityContext) -> Result<Credential, AuthError> {
        let key = context.cache_key();
        if let Some(credential) = self.usable(&key) {
            debug!(cache_key = %key, "Credential cache hit");
            return Ok(credential);
        }

        let lock = self.lock_for(&key);
        let _guard = lock.lock().await;

        // Another caller may have finished while we waited.
        if let Some(credential) = self.usable(&key) {
            debug!(cache_key = %key, "Credential refreshed by concurrent caller");
            return Ok(credential);
        }

        debug!(cache_key = %key, "Credential cache miss");
        if let Some(current) = self.cache.peek_stale(&key).filter(Credential::can_refresh) {
            match self.refresh_in_place(&key, &current).await {
                Ok(credential) => return Ok(credential),
                Err(err) => {
                    warn!(cache_key = %key, error = %err, "Refresh failed, re-authenticating");
                }
            }
        }

        self.authenticate(context).await
    }

    /// Replace the context's credential regardless of its remaining lifetime.
    ///
    /// Uses the refresh token of the previous credential when there is one,
    /// even if that credential has already expired.
    pub async fn force_refresh(&self, context: &IdentityContext) -> Result<Credential, AuthError> {
        let key = context.cache_key();
        let lock = self.lock_for(&key);
        let _guard = lock.lock().await;

        if let Some(previous) = self.cache.take(&key).filter(Credential::can_refresh) {
            match self.refresh_in_place(&key, &previous).await {
                Ok(credential) => return Ok(credential),
                Err(err) => {
                    warn!(cache_key = %key, error = %err, "Forced refresh failed");
                }
            }
        }

        self.authenticate(context).await
    }

    /// Load a persisted credential into the cache.
    ///
    /// An expired credential with a refresh token is refreshed; one without
    /// is discarded. Returns `Ok(None)` when nothing usable was stored.
    pub async fn restore(
        &self,
        context: &IdentityContext,
    ) -> Result<Option<Credential>, AuthError> {
        let Some(store) = &self.store else {
            return Ok(None);
        };
        let key = context.cache_key();
        let Some(stored) = store.retrieve(&key).await? else {
            debug!(cache_key = %key, "No persisted credential");
            return Ok(None);
        };

        if stored.expires_at > self.cache.now() {
            info!(cache_key = %key, "Restored persisted credential");
            self.cache.put(key, stored.clone());
            return Ok(Some(stored));
        }

        if stored.can_refresh() {
            let lock = self.lock_for(&key);
            let _guard = lock.lock().await;
            let credential = self.refresh_in_place(&key, &stored).await?;
            return Ok(Some(credential));
        }

        debug!(cache_key = %key, "Discarding expired persisted credential");
        store.delete(&key).await?;
        Ok(None)
    }

    /// Drop the cached credential so the next lookup goes to the authority.
    pub fn invalidate(&self, context: &IdentityContext) {
        let key = context.cache_key();
        debug!(cache_key = %key, "Invalidating cached credential");
        self.cache.take(&key);
    }

    /// Forget the context's credential in memory and in the store.
    pub async fn logout(&self, context: &IdentityContext) -> Result<(), AuthError> {
        let key = context.cache_key();
        self.cache.take(&key);
        self.inflight.remove(&key);
        if let Some(store) = &self.store {
            store.delete(&key).await?;
        }
        info!(cache_key = %key, "Logged out");
        Ok(())
    }

    /// Keep `context` warm until `cancel` fires.
    ///
    /// Sleeps until the cached credential enters the refresh window, then
    /// refreshes it. Failures are logged and retried after a minute.
    pub fn spawn_auto_refresh(
        self: &Arc<Self>,
        context: IdentityContext,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let key = context.cache_key();
            info!(cache_key = %key, "Starting credential auto-refresh");
            loop {
                let wait = manager.time_until_refresh(&key);
                if !wait.is_zero() {
                    debug!(cache_key = %key, wait_ms = wait.as_millis(), "Auto-refresh sleeping");
                }
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    () = tokio::time::sleep(wait) => {}
                }

                if let Err(err) = manager.get_or_refresh(&context).await {
                    warn!(cache_key = %key, error = %err, "Auto-refresh failed");
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => break,
                        () = tokio::time::sleep(AUTO_REFRESH_RETRY) => {}
                    }
                }
            }
            info!(cache_key = %key, "Credential auto-refresh stopped");
        })
    }

    /// Zero when nothing is cached, otherwise at least
    /// [`AUTO_REFRESH_MIN_WAIT`].
    fn time_until_refresh(&self, key: &CacheKey) -> Duration {
        match self.cache.get_with_lifetime(key) {
            Some((credential, lifetime)) => {
                let due = self.refresh_due(&credential, lifetime) - self.cache.now();
                due.to_std().unwrap_or(Duration::ZERO).max(AUTO_REFRESH_MIN_WAIT)
            }
            None => Duration::ZERO,
        }
    }

    /// Instant at which `credential` enters its refresh window.
    fn refresh_due(&self, credential: &Credential, lifetime: ChronoDuration) -> DateTime<Utc> {
        let threshold = ChronoDuration::seconds(self.refresh_threshold_secs).min(lifetime / 2);
        credential.expires_at - threshold.max(ChronoDuration::zero())
    }

    fn exchange<'a>(
        &'a self,
        method: &'a AuthMethod,
        session_name: &'a str,
    ) -> BoxFuture<'a, Result<Credential, AuthError>> {
        Box::pin(async move {
            match method {
                AuthMethod::Password { username, password } => {
                    self.authority.password_grant(username, password).await
                }
                AuthMethod::ApiKey { key_id, secret } => {
                    self.authority.api_key_grant(key_id, secret).await
                }
                AuthMethod::AuthorizationCode { code, state } => {
                    self.authority.exchange_code(code, state).await
                }
                AuthMethod::RefreshToken { refresh_token } => {
                    self.authority.refresh(refresh_token).await
                }
                AuthMethod::RoleChain { source, chain } => {
                    let mut caller = self.exchange(source, session_name).await?;
                    for (index, hop) in chain.hops().iter().enumerate() {
                        debug!(hop = index, role = %hop.role_name, "Walking role chain");
                        caller = self
                            .authority
                            .assume_role(&caller, hop, session_name)
                            .await
                            .map_err(|err| AuthError::HopFailed {
                                index,
                                role: hop.role_name.clone(),
                                source: Box::new(err),
                            })?;
                    }
                    Ok(caller)
                }
            }
        })
    }

    async fn refresh_in_place(
        &self,
        key: &CacheKey,
        current: &Credential,
    ) -> Result<Credential, AuthError> {
        let refresh_token = current.refresh_token.as_deref().ok_or(AuthError::NoRefreshToken)?;
        debug!(cache_key = %key, "Refreshing credential in place");

        let mut credential = self.authority.refresh(refresh_token).await?;
        if credential.session_name.is_none() {
            credential.session_name = current.session_name.clone();
        }
        self.ensure_live(&credential)?;
        self.remember(key.clone(), &credential).await;
        Ok(credential)
    }

    /// Cached credential that is not yet inside the refresh window.
    fn usable(&self, key: &CacheKey) -> Option<Credential> {
        let now = self.cache.now();
        self.cache
            .get_with_lifetime(key)
            .filter(|(credential, lifetime)| self.refresh_due(credential, *lifetime) > now)
            .map(|(credential, _)| credential)
    }

    fn ensure_live(&self, credential: &Credential) -> Result<(), AuthError> {
        if credential.expires_at <= self.cache.now() {
            return Err(AuthError::ExpiredOnArrival { expired_at: credential.expires_at });
        }
        Ok(())
    }

    async fn remember(&self, key: CacheKey, credential: &Credential) {
        if let Some(store) = &self.store {
            if let Err(err) = store.store(&key, credential).await {
                warn!(cache_key = %key, error = %err, "Failed to persist credential");
            }
        }
        self.cache.put(key, credential.clone());
    }

    fn lock_for(&self, key: &CacheKey) -> Arc<Mutex<()>> {
        Arc::clone(self.inflight.entry(key.clone()).or_default().value())
    }
}

impl std::fmt::Debug for CredentialManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialManager")
            .field("cache", &self.cache)
            .field("has_store", &self.store.is_some())
            .field("refresh_threshold_secs", &self.refresh_threshold_secs)
            .finish_non_exhaustive()
    }
}
