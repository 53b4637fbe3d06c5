//! API client facade
//!
//! [`ApiClient`] owns everything one logical connection needs: the transport,
//! the credential manager and its cache, the paginator and a shutdown token.
//! Nothing is global; dropping the client (or calling
//! [`ApiClient::shutdown`]) tears it all down.

use std::sync::Arc;
use std::time::Duration;

use courier_common::auth::{
    AuthorityClient, AuthorityClientTrait, CredentialCache, CredentialManager,
    CredentialStoreTrait, FileCredentialStore, KeychainCredentialStore,
};
use courier_common::resilience::{SharedClock, SystemClock};
use courier_domain::{ClientConfig, Credential, IdentityContext, PersistenceSettings, RequestSpec};
use futures::stream::BoxStream;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::auth::{AccessTokenProvider, ManagedCredentialProvider};
use super::errors::{ApiError, FailureKind, FailureReason};
use super::executor::{ApiResponse, Outcome, RequestExecutor};
use super::paginator::Paginator;
use super::retry::{execute_with_options, RetryOptions};
use super::rpc;
use crate::http::HttpClient;

/// Timeout for [`ApiClient::health_check`].
const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Authenticated API client with retry, pagination and credential caching
pub struct ApiClient {
    config: ClientConfig,
    executor: Arc<RequestExecutor>,
    manager: Arc<CredentialManager>,
    provider: Arc<dyn AccessTokenProvider>,
    identity: Option<IdentityContext>,
    paginator: Paginator,
    shutdown: CancellationToken,
}

impl ApiClient {
    /// Create a builder for fluent configuration
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn credential_manager(&self) -> &Arc<CredentialManager> {
        &self.manager
    }

    pub fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    /// Retry options from the `[retry]` section, bound to this client's
    /// shutdown token.
    pub fn retry_options(&self) -> RetryOptions {
        RetryOptions::from_settings(&self.config.retry).with_cancellation(self.shutdown.clone())
    }

    /// Exchange the context's secrets for a fresh credential.
    ///
    /// # Errors
    /// [`ApiError::Auth`] when the authority rejects the exchange.
    pub async fn authenticate(&self, context: &IdentityContext) -> Result<Credential, ApiError> {
        Ok(self.manager.authenticate(context).await?)
    }

    /// A cached credential if still valid, otherwise a new one.
    ///
    /// # Errors
    /// [`ApiError::Auth`] when a new credential cannot be obtained.
    pub async fn get_or_refresh(&self, context: &IdentityContext) -> Result<Credential, ApiError> {
        Ok(self.manager.get_or_refresh(context).await?)
    }

    /// Load the persisted credential for `context`, if any.
    ///
    /// # Errors
    /// [`ApiError::Auth`] when the store cannot be read.
    pub async fn restore(
        &self,
        context: &IdentityContext,
    ) -> Result<Option<Credential>, ApiError> {
        Ok(self.manager.restore(context).await?)
    }

    /// Forget `context`'s credential in memory and in the store.
    ///
    /// # Errors
    /// [`ApiError::Auth`] when the store entry cannot be removed.
    pub async fn logout(&self, context: &IdentityContext) -> Result<(), ApiError> {
        Ok(self.manager.logout(context).await?)
    }

    /// Send `spec` once and classify the result.
    ///
    /// A 401 still gets its single refresh-and-retry.
    ///
    /// # Errors
    /// [`ApiError::Auth`] when no credential can be obtained.
    #[instrument(skip(self, spec), fields(method = spec.method.as_str(), path = %spec.path))]
    pub async fn execute(&self, spec: &RequestSpec) -> Result<Outcome, ApiError> {
        Ok(self.executor.execute(spec, self.provider.as_ref()).await?)
    }

    /// Send `spec`, retrying transient failures.
    ///
    /// # Errors
    /// See [`execute_with_options`](super::retry::execute_with_options).
    pub async fn execute_with_retry(
        &self,
        spec: &RequestSpec,
        max_attempts: u32,
        base_delay: Duration,
    ) -> Result<ApiResponse, ApiError> {
        let options = RetryOptions::new(max_attempts, base_delay)
            .with_max_delay(self.config.retry.max_delay().max(base_delay))
            .with_cancellation(self.shutdown.clone());
        let options = if self.config.retry.jitter { options } else { options.without_jitter() };
        self.execute_with_options(spec, &options).await
    }

    /// Send `spec` with explicit retry options.
    ///
    /// # Errors
    /// See [`execute_with_options`](super::retry::execute_with_options).
    #[instrument(skip(self, spec, options), fields(path = %spec.path))]
    pub async fn execute_with_options(
        &self,
        spec: &RequestSpec,
        options: &RetryOptions,
    ) -> Result<ApiResponse, ApiError> {
        execute_with_options(&self.executor, spec, self.provider.as_ref(), options).await
    }

    /// GET `path` with the configured retry policy and decode the body.
    ///
    /// # Errors
    /// Request failures, or [`ApiError::Decode`] when the body does not fit `T`.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response =
            self.execute_with_options(&RequestSpec::get(path), &self.retry_options()).await?;
        response.json()
    }

    /// POST `body` to `path` with the configured retry policy.
    ///
    /// # Errors
    /// Request failures, or [`ApiError::Decode`] when either body does not
    /// serialize or decode.
    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = serde_json::to_value(body)
            .map_err(|e| ApiError::Decode(format!("Failed to serialize body: {e}")))?;
        let spec = RequestSpec::post(path).json(body);
        let response = self.execute_with_options(&spec, &self.retry_options()).await?;
        response.json()
    }

    /// Stream every record behind a paged list endpoint.
    pub fn iterate<T>(
        &self,
        base_spec: RequestSpec,
        page_size: u32,
    ) -> BoxStream<'static, Result<T, ApiError>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.paginator.iterate(base_spec, page_size)
    }

    /// [`ApiClient::iterate`] with the configured page size.
    pub fn iterate_default<T>(
        &self,
        base_spec: RequestSpec,
    ) -> BoxStream<'static, Result<T, ApiError>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.paginator.iterate(base_spec, self.config.pagination.page_size)
    }

    /// Run a GraphQL query and return its `data`.
    ///
    /// # Errors
    /// Request failures, or [`ApiError::Fatal`] when the response carries
    /// `errors`.
    pub async fn graphql(
        &self,
        path: &str,
        query: &str,
        variables: Option<Value>,
    ) -> Result<Value, ApiError> {
        let spec = rpc::graphql_request(path, query, variables);
        let response = self.execute_with_options(&spec, &self.retry_options()).await?;
        let attempts = response.attempts;
        rpc::graphql_data(response.body).map_err(|reason| ApiError::Fatal { reason, attempts })
    }

    /// Invoke an RPC-style `method` and return its `result`.
    ///
    /// # Errors
    /// Request failures, or [`ApiError::Fatal`] when the response carries an
    /// `error`.
    pub async fn call(&self, path: &str, method: &str, params: Value) -> Result<Value, ApiError> {
        let spec = rpc::rpc_request(path, method, params);
        let response = self.execute_with_options(&spec, &self.retry_options()).await?;
        let attempts = response.attempts;
        rpc::rpc_result(response.body).map_err(|reason| ApiError::Fatal { reason, attempts })
    }

    /// Unauthenticated probe of `path`.
    ///
    /// # Returns
    ///
    /// `true` on 2xx, `false` on any other status
    ///
    /// # Errors
    ///
    /// Returns error if the server cannot be reached
    #[instrument(skip(self))]
    pub async fn health_check(&self, path: &str) -> Result<bool, ApiError> {
        let url = self.executor.resolve(path).map_err(|message| ApiError::Fatal {
            reason: FailureReason::new(FailureKind::Malformed, message),
            attempts: 0,
        })?;

        debug!(url = %url, "Health check");

        let http = HttpClient::builder()
            .timeout(HEALTH_CHECK_TIMEOUT)
            .user_agent(&self.config.api.user_agent)
            .build()?;
        let request = http.request(reqwest::Method::GET, url);

        match http.send(request).await {
            Ok(resp) if resp.status().is_success() => {
                info!("API is healthy");
                Ok(true)
            }
            Ok(resp) => {
                warn!(status = %resp.status(), "API returned non-success status");
                Ok(false)
            }
            Err(e) => {
                warn!(error = %e, "Health check failed");
                let kind =
                    if e.is_timeout() { FailureKind::Timeout } else { FailureKind::Connection };
                let reason = FailureReason::new(kind, e.to_string());
                Err(ApiError::Fatal { reason, attempts: 1 })
            }
        }
    }

    /// Keep the default identity's credential refreshed until shutdown.
    ///
    /// # Errors
    /// [`ApiError::Config`] when the client was built without an identity.
    pub fn spawn_auto_refresh(&self) -> Result<JoinHandle<()>, ApiError> {
        let identity = self
            .identity
            .clone()
            .ok_or_else(|| ApiError::Config("no identity configured".to_string()))?;
        Ok(self.manager.spawn_auto_refresh(identity, self.shutdown.child_token()))
    }

    /// Cancel in-flight retries and page streams, then drop cached
    /// credentials. Persisted credentials are kept.
    pub fn shutdown(&self) {
        if self.shutdown.is_cancelled() {
            return;
        }
        info!("Shutting down API client");
        self.shutdown.cancel();
        self.manager.cache().clear();
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

impl Drop for ApiClient {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Builder for API client
#[derive(Default)]
pub struct ApiClientBuilder {
    config: Option<ClientConfig>,
    identity: Option<IdentityContext>,
    authority: Option<Arc<dyn AuthorityClientTrait>>,
    store: Option<Arc<dyn CredentialStoreTrait>>,
    provider: Option<Arc<dyn AccessTokenProvider>>,
    clock: Option<SharedClock>,
    http: Option<HttpClient>,
}

impl ApiClientBuilder {
    /// Set the client configuration
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Identity used by `execute`, `iterate` and the RPC helpers
    pub fn identity(mut self, identity: IdentityContext) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Replace the OAuth authority built from the `[auth]` section
    pub fn authority(mut self, authority: Arc<dyn AuthorityClientTrait>) -> Self {
        self.authority = Some(authority);
        self
    }

    /// Replace the store selected by the `[persistence]` section
    pub fn credential_store(mut self, store: Arc<dyn CredentialStoreTrait>) -> Self {
        self.store = Some(store);
        self
    }

    /// Bypass the credential manager for request credentials
    pub fn credential_provider(mut self, provider: Arc<dyn AccessTokenProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn clock(mut self, clock: SharedClock) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn http_client(mut self, http: HttpClient) -> Self {
        self.http = Some(http);
        self
    }

    /// Build the API client
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Config`] if the configuration is missing or
    /// invalid, or if neither an identity nor a credential provider was set
    pub fn build(self) -> Result<ApiClient, ApiError> {
        let config =
            self.config.ok_or_else(|| ApiError::Config("configuration not set".to_string()))?;
        config.validate()?;

        let http = match self.http {
            Some(http) => http,
            None => HttpClient::from_settings(&config.api)?,
        };

        let authority: Arc<dyn AuthorityClientTrait> = match self.authority {
            Some(authority) => authority,
            None => Arc::new(AuthorityClient::with_http_client(
                config.auth.clone(),
                http.inner().clone(),
            )),
        };

        let clock: SharedClock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let cache = CredentialCache::with_clock(clock, config.cache.max_entries);
        let mut manager = CredentialManager::new(authority, cache)
            .with_refresh_threshold(config.auth.refresh_threshold_secs);
        if let Some(store) = self.store.or_else(|| store_for(&config.persistence)) {
            manager = manager.with_store(store);
        }
        let manager = Arc::new(manager);

        let provider: Arc<dyn AccessTokenProvider> = match (self.provider, &self.identity) {
            (Some(provider), _) => provider,
            (None, Some(identity)) => {
                Arc::new(ManagedCredentialProvider::new(Arc::clone(&manager), identity.clone()))
            }
            (None, None) => {
                return Err(ApiError::Config(
                    "either an identity or a credential provider must be set".to_string(),
                ));
            }
        };

        let executor = Arc::new(RequestExecutor::new(http, config.api.base_url.clone()));
        let shutdown = CancellationToken::new();
        let retry = RetryOptions::from_settings(&config.retry).with_cancellation(shutdown.clone());
        let paginator = Paginator::new(
            Arc::clone(&executor),
            Arc::clone(&provider),
            config.pagination.clone(),
            retry,
        );

        info!(base_url = %config.api.base_url, "API client ready");
        Ok(ApiClient {
            config,
            executor,
            manager,
            provider,
            identity: self.identity,
            paginator,
            shutdown,
        })
    }
}

fn store_for(settings: &PersistenceSettings) -> Option<Arc<dyn CredentialStoreTrait>> {
    match settings {
        PersistenceSettings::None => None,
        PersistenceSettings::File { path } => Some(Arc::new(FileCredentialStore::new(path))),
        PersistenceSettings::Keychain { service } => {
            Some(Arc::new(KeychainCredentialStore::new(service.clone())))
        }
    }
}

#[cfg(test)]
mod tests {
    use courier_common::testing::{MockAuthority, MockCredentialStore};
    use courier_domain::AuthMethod;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::api::auth::StaticCredentialProvider;

    fn config(base_url: &str) -> ClientConfig {
        ClientConfig::new(base_url, "https://auth.example.com/token", "cli")
    }

    fn identity() -> IdentityContext {
        IdentityContext::new(
            "111111111111",
            "sess",
            AuthMethod::Password { username: "Admin".into(), password: "pw".into() },
        )
    }

    #[tokio::test]
    async fn test_health_check_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&mock_server)
            .await;

        let client = ApiClient::builder()
            .config(config(&mock_server.uri()))
            .identity(identity())
            .authority(Arc::new(MockAuthority::default()))
            .build()
            .unwrap();

        assert!(client.health_check("/health").await.unwrap());
    }

    #[tokio::test]
    async fn test_health_check_failure() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let client = ApiClient::builder()
            .config(config(&mock_server.uri()))
            .credential_provider(Arc::new(StaticCredentialProvider::new(
                Credential::with_lifetime("t", 60),
            )))
            .build()
            .unwrap();

        // Unhealthy but no error
        assert!(!client.health_check("/health").await.unwrap());
    }

    #[test]
    fn test_builder_missing_config() {
        let result = ApiClient::builder().identity(identity()).build();
        assert!(matches!(result, Err(ApiError::Config(_))));
    }

    #[test]
    fn test_builder_missing_identity_and_provider() {
        let result = ApiClient::builder().config(config("https://api.example.com")).build();
        assert!(matches!(result, Err(ApiError::Config(_))));
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let result = ApiClient::builder().config(config("")).identity(identity()).build();
        assert!(matches!(result, Err(ApiError::Config(msg)) if msg.contains("api.base_url")));
    }

    #[tokio::test]
    async fn test_builder_wires_persistence_store() {
        let store = Arc::new(MockCredentialStore::new());
        let client = ApiClient::builder()
            .config(config("https://api.example.com"))
            .identity(identity())
            .authority(Arc::new(MockAuthority::default()))
            .credential_store(store.clone())
            .build()
            .unwrap();

        client.authenticate(&identity()).await.unwrap();
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_clears_cache_and_cancels() {
        let authority = Arc::new(MockAuthority::default());
        let client = ApiClient::builder()
            .config(config("https://api.example.com"))
            .identity(identity())
            .authority(authority.clone())
            .build()
            .unwrap();

        client.get_or_refresh(&identity()).await.unwrap();
        assert_eq!(client.credential_manager().cache().len(), 1);

        client.shutdown();
        assert!(client.is_shut_down());
        assert!(client.credential_manager().cache().is_empty());

        let err = client
            .execute_with_retry(&RequestSpec::get("/items"), 3, Duration::from_millis(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Cancelled { .. }));
    }

    #[tokio::test]
    async fn test_auto_refresh_requires_identity() {
        let client = ApiClient::builder()
            .config(config("https://api.example.com"))
            .credential_provider(Arc::new(StaticCredentialProvider::new(
                Credential::with_lifetime("t", 60),
            )))
            .build()
            .unwrap();
        assert!(matches!(client.spawn_auto_refresh(), Err(ApiError::Config(_))));
    }
}
