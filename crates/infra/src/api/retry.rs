//! Retry wrapper around [`RequestExecutor`]
//!
//! Drives the executor through the shared
//! [`RetryExecutor`](courier_common::resilience::RetryExecutor): retryable
//! outcomes back off `base_delay * 2^(attempt-1)`, fatal outcomes and
//! authentication failures stop immediately. A fresh credential is requested
//! from the provider on every attempt.

use std::time::Duration;

use courier_common::resilience::{
    BackoffStrategy, Jitter, RetryConfig, RetryDecision, RetryExecutor, RetryPolicy,
};
use courier_domain::constants::DEFAULT_MAX_DELAY_MS;
use courier_domain::{RequestSpec, RetrySettings};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::auth::AccessTokenProvider;
use super::errors::{ApiError, AttemptError};
use super::executor::{ApiResponse, Outcome, RequestExecutor};

/// Knobs for one retried call.
#[derive(Debug, Clone)]
pub struct RetryOptions {
    pub max_attempts: u32,
    pub base_delay: Duration,
    /// Cap on any single sleep, `Retry-After` included.
    pub max_delay: Duration,
    pub jitter: Jitter,
    /// Budget for all attempts and sleeps together.
    pub deadline: Option<Duration>,
    pub cancel: Option<CancellationToken>,
}

impl RetryOptions {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay: base_delay.max(Duration::from_millis(DEFAULT_MAX_DELAY_MS)),
            jitter: Jitter::Equal,
            deadline: None,
            cancel: None,
        }
    }

    /// Options from the `[retry]` config section.
    pub fn from_settings(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts,
            base_delay: settings.base_delay(),
            max_delay: settings.max_delay(),
            jitter: if settings.jitter { Jitter::Equal } else { Jitter::None },
            deadline: None,
            cancel: None,
        }
    }

    #[must_use]
    pub const fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    #[must_use]
    pub const fn without_jitter(mut self) -> Self {
        self.jitter = Jitter::None;
        self
    }

    #[must_use]
    pub const fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    fn to_config(&self) -> Result<RetryConfig, ApiError> {
        let config = RetryConfig {
            max_attempts: self.max_attempts,
            backoff: BackoffStrategy::exponential(self.base_delay, self.max_delay),
            jitter: self.jitter,
            max_total_time: self.deadline,
        };
        config.validate().map_err(|e| ApiError::Config(e.to_string()))?;
        Ok(config)
    }
}

/// Retries retryable outcomes, honouring `Retry-After`.
struct OutcomePolicy;

impl RetryPolicy<AttemptError> for OutcomePolicy {
    fn should_retry(&self, error: &AttemptError, _attempt: u32) -> RetryDecision {
        match error {
            AttemptError::Retryable(reason) => {
                reason.retry_after.map_or(RetryDecision::Retry, RetryDecision::RetryAfter)
            }
            AttemptError::Fatal(_) | AttemptError::Auth(_) => RetryDecision::Stop,
        }
    }
}

/// Execute `spec`, retrying transient failures with exponential backoff.
///
/// Jitter is applied to every computed delay.
///
/// # Errors
/// - [`ApiError::RetriesExhausted`] after `max_attempts` retryable failures
/// - [`ApiError::Fatal`] on the first non-retryable failure
/// - [`ApiError::Auth`] when no credential can be obtained
/// - [`ApiError::Config`] when `max_attempts` is zero
pub async fn execute_with_retry(
    executor: &RequestExecutor,
    spec: &RequestSpec,
    provider: &dyn AccessTokenProvider,
    max_attempts: u32,
    base_delay: Duration,
) -> Result<ApiResponse, ApiError> {
    execute_with_options(executor, spec, provider, &RetryOptions::new(max_attempts, base_delay))
        .await
}

/// [`execute_with_retry`] with a deadline, cancellation and jitter control.
///
/// # Errors
/// As [`execute_with_retry`], plus [`ApiError::DeadlineExceeded`] and
/// [`ApiError::Cancelled`].
pub async fn execute_with_options(
    executor: &RequestExecutor,
    spec: &RequestSpec,
    provider: &dyn AccessTokenProvider,
    options: &RetryOptions,
) -> Result<ApiResponse, ApiError> {
    let mut retry = RetryExecutor::new(options.to_config()?, OutcomePolicy);
    if let Some(token) = &options.cancel {
        retry = retry.with_cancellation(token.clone());
    }

    let outcome = retry
        .execute_with_outcome(|| async move {
            match executor.execute(spec, provider).await {
                Ok(Outcome::Success(response)) => Ok(response),
                Ok(Outcome::RetryableFailure(reason)) => Err(AttemptError::Retryable(reason)),
                Ok(Outcome::FatalFailure(reason)) => Err(AttemptError::Fatal(reason)),
                Err(err) => Err(AttemptError::Auth(err)),
            }
        })
        .await;

    let attempts = outcome.attempts;
    match outcome.into_result() {
        Ok(mut response) => {
            debug!(path = %spec.path, attempts, status = response.status, "Request succeeded");
            response.attempts = attempts;
            Ok(response)
        }
        Err(err) => {
            let err = ApiError::from(err);
            warn!(
                path = %spec.path,
                attempts,
                status = ?err.status(),
                error = %err,
                "Request failed"
            );
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use courier_domain::RetrySettings;

    use super::*;
    use crate::api::errors::FailureReason;

    #[test]
    fn options_follow_settings() {
        let settings = RetrySettings { jitter: false, ..RetrySettings::default() };
        let options = RetryOptions::from_settings(&settings);
        assert_eq!(options.max_attempts, 3);
        assert_eq!(options.base_delay, Duration::from_millis(200));
        assert_eq!(options.jitter, Jitter::None);
    }

    #[test]
    fn zero_attempts_is_a_config_error() {
        let options = RetryOptions::new(0, Duration::from_millis(10));
        assert!(matches!(options.to_config(), Err(ApiError::Config(_))));
    }

    #[test]
    fn policy_honours_retry_after_and_stops_on_fatal() {
        let policy = OutcomePolicy;
        let plain = AttemptError::Retryable(FailureReason::status(503, "down"));
        assert_eq!(policy.should_retry(&plain, 1), RetryDecision::Retry);

        let delayed = AttemptError::Retryable(
            FailureReason::status(429, "slow").with_retry_after(Some(Duration::from_secs(4))),
        );
        assert_eq!(
            policy.should_retry(&delayed, 1),
            RetryDecision::RetryAfter(Duration::from_secs(4))
        );

        let fatal = AttemptError::Fatal(FailureReason::status(404, "missing"));
        assert_eq!(policy.should_retry(&fatal, 1), RetryDecision::Stop);
    }

    #[test]
    fn max_delay_never_below_base_delay() {
        let options = RetryOptions::new(3, Duration::from_secs(60));
        assert_eq!(options.max_delay, Duration::from_secs(60));
    }
}
