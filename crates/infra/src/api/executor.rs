//! Single-attempt request execution and response classification
//!
//! [`RequestExecutor`] turns a [`RequestSpec`] plus a credential into exactly
//! one HTTP exchange and sorts the result into an [`Outcome`]. It never
//! sleeps and never retries on its own, with one exception: a 401 triggers a
//! single credential refresh and one more attempt.

use std::collections::HashMap;
use std::time::Duration;

use courier_common::auth::AuthError;
use courier_domain::{Credential, HttpMethod, RequestSpec};
use reqwest::header::{ACCEPT, AUTHORIZATION, RETRY_AFTER};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use super::auth::AccessTokenProvider;
use super::errors::{ApiError, FailureKind, FailureReason};
use crate::http::HttpClient;

/// Longest slice of an error body kept in a [`FailureReason`].
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Successful response with its body parsed as JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    /// Header names are lowercase.
    pub headers: HashMap<String, String>,
    /// `Value::Null` for empty bodies, `Value::String` for non-JSON text.
    pub body: Value,
    /// Attempts it took to get this response.
    pub attempts: u32,
}

impl ApiResponse {
    /// Deserialize the body into `T`.
    ///
    /// # Errors
    /// [`ApiError::Decode`] when the body does not match `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_value(self.body.clone()).map_err(|e| ApiError::Decode(e.to_string()))
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

/// Classified result of one exchange.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success(ApiResponse),
    /// 429, 502, 503, 504, timeouts and connection failures.
    RetryableFailure(FailureReason),
    /// Everything else, including a 401 that survived one refresh.
    FatalFailure(FailureReason),
}

impl Outcome {
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::RetryableFailure(_))
    }

    /// HTTP status of the exchange, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Success(response) => Some(response.status),
            Self::RetryableFailure(reason) | Self::FatalFailure(reason) => reason.status,
        }
    }
}

/// Issues authenticated requests against one base URL.
#[derive(Debug, Clone)]
pub struct RequestExecutor {
    http: HttpClient,
    base_url: String,
    default_timeout: Duration,
}

impl RequestExecutor {
    pub fn new(http: HttpClient, base_url: impl Into<String>) -> Self {
        let default_timeout = http.timeout();
        Self { http, base_url: base_url.into(), default_timeout }
    }

    #[must_use]
    pub const fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolve `path` against the base URL; absolute URLs pass through.
    ///
    /// # Errors
    /// The reason a malformed URL was rejected.
    pub fn resolve(&self, path: &str) -> Result<Url, String> {
        let raw = if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}/{}", self.base_url.trim_end_matches('/'), path.trim_start_matches('/'))
        };
        Url::parse(&raw).map_err(|e| format!("invalid request URL '{raw}': {e}"))
    }

    /// Execute `spec` with a credential from `provider`.
    ///
    /// A 401 invalidates the credential, asks the provider for a new one and
    /// repeats the call once. A second 401 is a [`Outcome::FatalFailure`].
    ///
    /// # Errors
    /// [`AuthError`] when the provider cannot produce a credential.
    pub async fn execute(
        &self,
        spec: &RequestSpec,
        provider: &dyn AccessTokenProvider,
    ) -> Result<Outcome, AuthError> {
        let credential = provider.credential().await?;
        let outcome = self.send(spec, &credential).await;

        if outcome.status() != Some(StatusCode::UNAUTHORIZED.as_u16()) {
            return Ok(outcome);
        }

        debug!(path = %spec.path, "Received 401, refreshing credential once");
        let refreshed = provider.refresh().await?;
        let outcome = self.send(spec, &refreshed).await;
        if outcome.status() == Some(StatusCode::UNAUTHORIZED.as_u16()) {
            warn!(path = %spec.path, "Refreshed credential rejected");
        }
        Ok(outcome)
    }

    /// Send `spec` once with `credential` as the bearer token.
    pub async fn send(&self, spec: &RequestSpec, credential: &Credential) -> Outcome {
        if credential.is_expired() {
            return Outcome::FatalFailure(FailureReason::new(
                FailureKind::ExpiredCredential,
                format!("credential expired at {}", credential.expires_at),
            ));
        }

        let url = match self.resolve(&spec.path) {
            Ok(url) => url,
            Err(message) => {
                return Outcome::FatalFailure(FailureReason::new(FailureKind::Malformed, message));
            }
        };

        let timeout = spec.timeout.unwrap_or(self.default_timeout);
        let mut request = self
            .http
            .request(to_method(spec.method), url)
            .timeout(timeout)
            .header(AUTHORIZATION, credential.bearer())
            .header(ACCEPT, "application/json");
        for (name, value) in &spec.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if !spec.query.is_empty() {
            request = request.query(&spec.query);
        }
        if let Some(body) = &spec.body {
            request = request.json(body);
        }

        let response = match tokio::time::timeout(timeout, self.http.send(request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => return classify_transport_error(&err),
            Err(_) => {
                return Outcome::RetryableFailure(FailureReason::new(
                    FailureKind::Timeout,
                    format!("no response within {timeout:?}"),
                ));
            }
        };

        let status = response.status();
        let headers = collect_headers(&response);
        let text = match response.text().await {
            Ok(text) => text,
            Err(err) => return classify_transport_error(&err),
        };

        let outcome = if status.is_success() {
            Outcome::Success(ApiResponse {
                status: status.as_u16(),
                headers,
                body: parse_body(&text),
                attempts: 1,
            })
        } else {
            let retry_after = headers.get(RETRY_AFTER.as_str()).and_then(|v| parse_retry_after(v));
            classify_status(status, &text, retry_after)
        };

        debug!(
            method = spec.method.as_str(),
            path = %spec.path,
            status = status.as_u16(),
            success = outcome.is_success(),
            retryable = outcome.is_retryable(),
            "Classified response"
        );
        outcome
    }
}

const fn to_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}

/// Sort a non-2xx status into retryable or fatal.
pub(crate) fn classify_status(
    status: StatusCode,
    body: &str,
    retry_after: Option<Duration>,
) -> Outcome {
    let message = if body.trim().is_empty() {
        status.canonical_reason().unwrap_or("unknown status").to_string()
    } else {
        body.chars().take(MAX_ERROR_BODY_CHARS).collect()
    };
    let reason = FailureReason::status(status.as_u16(), message);

    match status {
        StatusCode::TOO_MANY_REQUESTS
        | StatusCode::BAD_GATEWAY
        | StatusCode::SERVICE_UNAVAILABLE
        | StatusCode::GATEWAY_TIMEOUT => {
            Outcome::RetryableFailure(reason.with_retry_after(retry_after))
        }
        _ => Outcome::FatalFailure(reason),
    }
}

fn classify_transport_error(err: &reqwest::Error) -> Outcome {
    if err.is_timeout() {
        return Outcome::RetryableFailure(FailureReason::new(
            FailureKind::Timeout,
            err.to_string(),
        ));
    }
    if err.is_connect() || err.is_request() || err.is_body() {
        return Outcome::RetryableFailure(FailureReason::new(
            FailureKind::Connection,
            err.to_string(),
        ));
    }
    Outcome::FatalFailure(FailureReason::new(FailureKind::Malformed, err.to_string()))
}

fn collect_headers(response: &reqwest::Response) -> HashMap<String, String> {
    response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value.to_str().ok().map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect()
}

fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

/// `Retry-After` in delta-seconds form; HTTP dates are ignored.
fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}
