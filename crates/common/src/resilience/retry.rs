//! Generic retry executor with backoff, jitter, a time budget and
//! cancellation
//!
//! The executor is agnostic of what it retries. A [`RetryPolicy`] looks at
//! each failure and decides whether to try again; [`BackoffStrategy`] and
//! [`Jitter`] decide how long to wait. Both the in-flight attempt and the
//! sleep between attempts are bounded by `max_total_time` and abort as soon
//! as the executor's [`CancellationToken`] fires.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Errors that can occur during retry operations
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// Every permitted attempt failed with a retryable error
    #[error("all {attempts} attempt(s) exhausted, last error: {last:?}")]
    AttemptsExhausted { attempts: u32, last: E },

    /// The policy refused to retry this error
    #[error("non-retryable error after {attempts} attempt(s): {error:?}")]
    NonRetryable { attempts: u32, error: E },

    /// The retry strategy configuration is invalid
    #[error("invalid retry configuration: {message}")]
    InvalidConfiguration { message: String },

    /// The total time budget ran out mid-attempt or mid-sleep
    #[error("retry budget of {budget:?} exceeded after {attempts} attempt(s)")]
    TimeoutExceeded { budget: Duration, attempts: u32 },

    /// The executor's cancellation token fired
    #[error("retry cancelled after {attempts} attempt(s)")]
    Cancelled { attempts: u32 },
}

impl<E> RetryError<E> {
    /// Number of attempts started before the executor gave up.
    pub const fn attempts(&self) -> u32 {
        match self {
            Self::AttemptsExhausted { attempts, .. }
            | Self::NonRetryable { attempts, .. }
            | Self::TimeoutExceeded { attempts, .. }
            | Self::Cancelled { attempts } => *attempts,
            Self::InvalidConfiguration { .. } => 0,
        }
    }

    /// The error returned by the final attempt, if one completed.
    pub const fn last_error(&self) -> Option<&E> {
        match self {
            Self::AttemptsExhausted { last, .. } => Some(last),
            Self::NonRetryable { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Result type for retry operations
pub type RetryResult<T, E> = Result<T, RetryError<E>>;

/// Outcome of a retry execution including summary statistics.
#[derive(Debug)]
pub struct RetryOutcome<T, E> {
    pub result: RetryResult<T, E>,
    pub attempts: u32,
    /// Time spent sleeping between attempts.
    pub total_delay: Duration,
    pub timed_out: bool,
}

impl<T, E> RetryOutcome<T, E> {
    pub fn into_result(self) -> RetryResult<T, E> {
        self.result
    }

    /// Mean sleep between attempts.
    pub fn average_delay(&self) -> Duration {
        if self.attempts <= 1 {
            return Duration::ZERO;
        }
        self.total_delay / (self.attempts - 1)
    }
}

/// Trait for determining whether an error should be retried
pub trait RetryPolicy<E> {
    /// Classify the error returned by attempt number `attempt` (1-based).
    fn should_retry(&self, error: &E, attempt: u32) -> RetryDecision;
}

/// Decision for whether to retry an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the backoff delay
    Retry,
    /// Retry after a server-specified delay (capped by the backoff maximum)
    RetryAfter(Duration),
    /// Don't retry the operation
    Stop,
}

/// Backoff strategy for calculating retry delays
#[derive(Debug, Clone, PartialEq)]
pub enum BackoffStrategy {
    /// Fixed delay between retries
    Fixed(Duration),
    /// `initial_delay + retry * increment`
    Linear { initial_delay: Duration, increment: Duration },
    /// `initial_delay * base^retry`, capped at `max_delay`
    Exponential { initial_delay: Duration, base: f64, max_delay: Duration },
}

impl BackoffStrategy {
    /// Doubling backoff: `base_delay * 2^(attempt-1)` before attempt `attempt+1`.
    pub const fn exponential(base_delay: Duration, max_delay: Duration) -> Self {
        Self::Exponential { initial_delay: base_delay, base: 2.0, max_delay }
    }

    /// Delay after the `retry`-th failure (0-based).
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn calculate_delay(&self, retry: u32) -> Duration {
        match self {
            Self::Fixed(delay) => *delay,
            Self::Linear { initial_delay, increment } => {
                initial_delay.saturating_add(increment.saturating_mul(retry))
            }
            Self::Exponential { initial_delay, base, max_delay } => {
                let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
                let delay = initial_delay.as_millis() as f64 * base.powi(exponent);
                // Float-to-int casts saturate, so an infinite product lands on the cap.
                let delay_ms = delay.min(max_delay.as_millis() as f64) as u64;
                Duration::from_millis(delay_ms)
            }
        }
    }

    pub const fn max_delay(&self) -> Option<Duration> {
        match self {
            Self::Exponential { max_delay, .. } => Some(*max_delay),
            _ => None,
        }
    }
}

/// Jitter type for adding randomness to retry delays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Jitter {
    None,
    /// Uniform in `0..=delay`
    Full,
    /// Uniform in `delay/2..=delay`
    Equal,
}

impl Jitter {
    #[allow(clippy::cast_possible_truncation)]
    pub fn apply(self, delay: Duration) -> Duration {
        let millis = delay.as_millis() as u64;
        match self {
            Self::None => delay,
            Self::Full => Duration::from_millis(random_up_to(millis)),
            Self::Equal => {
                let half = millis / 2;
                Duration::from_millis(half + random_up_to(millis - half))
            }
        }
    }
}

fn random_up_to(max: u64) -> u64 {
    if max == 0 {
        return 0;
    }
    rand::thread_rng().gen_range(0..=max)
}

/// Configuration for retry behavior
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first
    pub max_attempts: u32,
    pub backoff: BackoffStrategy,
    pub jitter: Jitter,
    /// Budget for the whole sequence, attempts and sleeps included
    pub max_total_time: Option<Duration>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: BackoffStrategy::exponential(
                Duration::from_millis(100),
                Duration::from_secs(30),
            ),
            jitter: Jitter::Equal,
            max_total_time: None,
        }
    }
}

impl RetryConfig {
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::new()
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` for zero attempts, a non-positive
    /// exponential base, or a zero time budget.
    pub fn validate(&self) -> Result<(), RetryError<()>> {
        if self.max_attempts == 0 {
            return Err(RetryError::InvalidConfiguration {
                message: "max_attempts must be greater than 0".to_string(),
            });
        }

        if let BackoffStrategy::Exponential { base, .. } = &self.backoff {
            if *base <= 0.0 || !base.is_finite() {
                return Err(RetryError::InvalidConfiguration {
                    message: "exponential base must be a positive number".to_string(),
                });
            }
        }

        if self.max_total_time == Some(Duration::ZERO) {
            return Err(RetryError::InvalidConfiguration {
                message: "max_total_time must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

/// Builder for RetryConfig with fluent API
#[derive(Debug, Default)]
pub struct RetryConfigBuilder {
    config: RetryConfig,
}

impl RetryConfigBuilder {
    pub fn new() -> Self {
        Self { config: RetryConfig::default() }
    }

    #[must_use]
    pub const fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.max_attempts = attempts;
        self
    }

    #[must_use]
    pub fn fixed_backoff(mut self, delay: Duration) -> Self {
        self.config.backoff = BackoffStrategy::Fixed(delay);
        self
    }

    #[must_use]
    pub fn linear_backoff(mut self, initial_delay: Duration, increment: Duration) -> Self {
        self.config.backoff = BackoffStrategy::Linear { initial_delay, increment };
        self
    }

    #[must_use]
    pub fn exponential_backoff(
        mut self,
        initial_delay: Duration,
        base: f64,
        max_delay: Duration,
    ) -> Self {
        self.config.backoff = BackoffStrategy::Exponential { initial_delay, base, max_delay };
        self
    }

    #[must_use]
    pub const fn jitter(mut self, jitter: Jitter) -> Self {
        self.config.jitter = jitter;
        self
    }

    #[must_use]
    pub const fn no_jitter(self) -> Self {
        self.jitter(Jitter::None)
    }

    #[must_use]
    pub const fn max_total_time(mut self, duration: Duration) -> Self {
        self.config.max_total_time = Some(duration);
        self
    }

    /// # Errors
    ///
    /// Propagates [`RetryConfig::validate`] failures.
    pub fn build(self) -> Result<RetryConfig, RetryError<()>> {
        self.config.validate()?;
        Ok(self.config)
    }
}

enum Interrupt {
    Deadline,
    Cancelled,
}

/// The main retry executor
#[derive(Debug, Clone)]
pub struct RetryExecutor<P> {
    config: RetryConfig,
    policy: P,
    cancel: Option<CancellationToken>,
}

impl<P> RetryExecutor<P> {
    pub const fn new(config: RetryConfig, policy: P) -> Self {
        Self { config, policy, cancel: None }
    }

    pub fn with_policy(policy: P) -> Self {
        Self::new(RetryConfig::default(), policy)
    }

    /// Abort the in-flight attempt or pending sleep when `token` fires.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub const fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Execute an operation with retry logic
    ///
    /// # Errors
    ///
    /// See [`RetryError`]; every variant reports the attempt count.
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> RetryResult<T, E>
    where
        P: RetryPolicy<E>,
        E: fmt::Debug,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.execute_with_outcome(operation).await.into_result()
    }

    /// Execute an operation with retry logic and return outcome statistics.
    pub async fn execute_with_outcome<F, Fut, T, E>(&self, mut operation: F) -> RetryOutcome<T, E>
    where
        P: RetryPolicy<E>,
        E: fmt::Debug,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let deadline = self.config.max_total_time.map(|budget| Instant::now() + budget);
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempts = 0_u32;
        let mut total_delay = Duration::ZERO;

        loop {
            attempts += 1;
            debug!(attempt = attempts, max_attempts, "executing operation");

            let error = match self.bounded(deadline, operation()).await {
                Ok(Ok(value)) => {
                    if attempts > 1 {
                        debug!(attempts, "operation succeeded after retries");
                    }
                    return Self::finish(Ok(value), attempts, total_delay);
                }
                Ok(Err(error)) => error,
                Err(interrupt) => return self.interrupted(interrupt, attempts, total_delay),
            };

            let delay = match self.policy.should_retry(&error, attempts) {
                RetryDecision::Stop => {
                    debug!(attempt = attempts, ?error, "retry policy declined to retry");
                    let result = Err(RetryError::NonRetryable { attempts, error });
                    return Self::finish(result, attempts, total_delay);
                }
                _ if attempts >= max_attempts => {
                    warn!(attempts, last_error = ?error, "all retry attempts exhausted");
                    let result = Err(RetryError::AttemptsExhausted { attempts, last: error });
                    return Self::finish(result, attempts, total_delay);
                }
                RetryDecision::Retry => {
                    let delay = self.config.backoff.calculate_delay(attempts - 1);
                    self.config.jitter.apply(delay)
                }
                RetryDecision::RetryAfter(requested) => {
                    self.config.backoff.max_delay().map_or(requested, |cap| requested.min(cap))
                }
            };

            warn!(
                attempt = attempts,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                ?error,
                "operation failed, retrying"
            );

            if let Err(interrupt) = self.bounded(deadline, tokio::time::sleep(delay)).await {
                return self.interrupted(interrupt, attempts, total_delay);
            }
            total_delay += delay;
        }
    }

    async fn bounded<Fut: Future>(
        &self,
        deadline: Option<Instant>,
        future: Fut,
    ) -> Result<Fut::Output, Interrupt> {
        let timed = async move {
            match deadline {
                Some(deadline) => {
                    tokio::time::timeout_at(deadline, future).await.map_err(|_| Interrupt::Deadline)
                }
                None => Ok(future.await),
            }
        };

        match &self.cancel {
            Some(token) => tokio::select! {
                biased;
                () = token.cancelled() => Err(Interrupt::Cancelled),
                result = timed => result,
            },
            None => timed.await,
        }
    }

    fn interrupted<T, E>(
        &self,
        interrupt: Interrupt,
        attempts: u32,
        total_delay: Duration,
    ) -> RetryOutcome<T, E> {
        let (result, timed_out) = match interrupt {
            Interrupt::Deadline => {
                let budget = self.config.max_total_time.unwrap_or_default();
                warn!(attempts, ?budget, "retry budget exceeded");
                (Err(RetryError::TimeoutExceeded { budget, attempts }), true)
            }
            Interrupt::Cancelled => {
                debug!(attempts, "retry cancelled");
                (Err(RetryError::Cancelled { attempts }), false)
            }
        };
        RetryOutcome { result, attempts, total_delay, timed_out }
    }

    const fn finish<T, E>(
        result: RetryResult<T, E>,
        attempts: u32,
        total_delay: Duration,
    ) -> RetryOutcome<T, E> {
        RetryOutcome { result, attempts, total_delay, timed_out: false }
    }
}

/// Convenience function to create a retry executor and execute an operation
///
/// # Errors
///
/// See [`RetryExecutor::execute`].
pub async fn retry_with_policy<F, Fut, T, E, P>(
    config: RetryConfig,
    policy: P,
    operation: F,
) -> RetryResult<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: RetryPolicy<E>,
    E: fmt::Debug,
{
    RetryExecutor::new(config, policy).execute(operation).await
}

/// Convenience function to retry with default configuration
///
/// # Errors
///
/// See [`RetryExecutor::execute`].
pub async fn retry<F, Fut, T, E, P>(policy: P, operation: F) -> RetryResult<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: RetryPolicy<E>,
    E: fmt::Debug,
{
    retry_with_policy(RetryConfig::default(), policy, operation).await
}

/// Pre-defined retry policies for common scenarios
pub mod policies {
    use super::{RetryDecision, RetryPolicy};

    /// Retries on any error
    #[derive(Debug, Clone, Copy)]
    pub struct AlwaysRetry;

    impl<E> RetryPolicy<E> for AlwaysRetry {
        fn should_retry(&self, _error: &E, _attempt: u32) -> RetryDecision {
            RetryDecision::Retry
        }
    }

    /// Never retries
    #[derive(Debug, Clone, Copy)]
    pub struct NeverRetry;

    impl<E> RetryPolicy<E> for NeverRetry {
        fn should_retry(&self, _error: &E, _attempt: u32) -> RetryDecision {
            RetryDecision::Stop
        }
    }

    /// Predicate-based retry policy
    #[derive(Debug)]
    pub struct PredicateRetry<F> {
        predicate: F,
    }

    impl<F> PredicateRetry<F> {
        pub const fn new(predicate: F) -> Self {
            Self { predicate }
        }
    }

    impl<F, E> RetryPolicy<E> for PredicateRetry<F>
    where
        F: Fn(&E, u32) -> bool,
    {
        fn should_retry(&self, error: &E, attempt: u32) -> RetryDecision {
            if (self.predicate)(error, attempt) {
                RetryDecision::Retry
            } else {
                RetryDecision::Stop
            }
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for backoff, jitter and the executor loop.

    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::policies::{AlwaysRetry, NeverRetry, PredicateRetry};
    use super::*;

    fn fast_config(max_attempts: u32) -> RetryConfig {
        RetryConfig::builder()
            .max_attempts(max_attempts)
            .fixed_backoff(Duration::from_millis(1))
            .no_jitter()
            .build()
            .unwrap()
    }

    /// Validates `BackoffStrategy::exponential` doubling.
    ///
    /// Assertions:
    /// - Delay before attempt N+1 is `base * 2^(N-1)`
    /// - Large retry counts saturate at `max_delay`
    #[test]
    fn test_backoff_strategy_exponential() {
        let strategy =
            BackoffStrategy::exponential(Duration::from_millis(100), Duration::from_secs(10));

        assert_eq!(strategy.calculate_delay(0), Duration::from_millis(100));
        assert_eq!(strategy.calculate_delay(1), Duration::from_millis(200));
        assert_eq!(strategy.calculate_delay(2), Duration::from_millis(400));
        assert_eq!(strategy.calculate_delay(3), Duration::from_millis(800));
        assert_eq!(strategy.calculate_delay(40), Duration::from_secs(10));
        assert_eq!(strategy.calculate_delay(u32::MAX), Duration::from_secs(10));
    }

    #[test]
    fn test_backoff_strategy_fixed_and_linear() {
        let fixed = BackoffStrategy::Fixed(Duration::from_millis(100));
        assert_eq!(fixed.calculate_delay(7), Duration::from_millis(100));
        assert_eq!(fixed.max_delay(), None);

        let linear = BackoffStrategy::Linear {
            initial_delay: Duration::from_millis(100),
            increment: Duration::from_millis(50),
        };
        assert_eq!(linear.calculate_delay(2), Duration::from_millis(200));
    }

    /// Validates jitter bounds.
    ///
    /// Assertions:
    /// - `Full` stays within `0..=delay`
    /// - `Equal` stays within `delay/2..=delay`
    #[test]
    fn test_jitter_bounds() {
        let delay = Duration::from_millis(100);
        for _ in 0..50 {
            assert!(Jitter::Full.apply(delay) <= delay);
            let equal = Jitter::Equal.apply(delay);
            assert!(equal >= Duration::from_millis(50) && equal <= delay);
        }
        assert_eq!(Jitter::None.apply(delay), delay);
        assert_eq!(Jitter::Full.apply(Duration::ZERO), Duration::ZERO);
    }

    #[test]
    fn test_retry_config_validation() {
        assert!(RetryConfig::default().validate().is_ok());
        assert!(RetryConfig::builder().max_attempts(0).build().is_err());
        assert!(RetryConfig::builder()
            .exponential_backoff(Duration::from_millis(1), 0.0, Duration::from_secs(1))
            .build()
            .is_err());
        assert!(RetryConfig::builder().max_total_time(Duration::ZERO).build().is_err());
    }

    /// Validates that an operation succeeding on the third try stops there.
    ///
    /// Assertions:
    /// - The operation runs exactly three times
    /// - The outcome reports three attempts and two sleeps
    #[tokio::test]
    async fn test_retry_executor_success_after_failures() {
        let counter = Arc::new(AtomicU32::new(0));
        let executor = RetryExecutor::new(fast_config(5), AlwaysRetry);

        let outcome = executor
            .execute_with_outcome(|| {
                let counter = Arc::clone(&counter);
                async move {
                    let count = counter.fetch_add(1, Ordering::SeqCst) + 1;
                    if count < 3 {
                        Err("transient")
                    } else {
                        Ok(count)
                    }
                }
            })
            .await;

        assert_eq!(outcome.attempts, 3);
        assert_eq!(outcome.total_delay, Duration::from_millis(2));
        assert_eq!(outcome.result.unwrap(), 3);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    /// Validates exhaustion keeps the last error.
    ///
    /// Assertions:
    /// - Exactly `max_attempts` invocations
    /// - `AttemptsExhausted` carries the count and the final error value
    #[tokio::test]
    async fn test_retry_executor_exhausts_attempts() {
        let counter = Arc::new(AtomicU32::new(0));
        let executor = RetryExecutor::new(fast_config(3), AlwaysRetry);

        let result: RetryResult<(), u32> = executor
            .execute(|| {
                let counter = Arc::clone(&counter);
                async move { Err(counter.fetch_add(1, Ordering::SeqCst) + 1) }
            })
            .await;

        match result {
            Err(RetryError::AttemptsExhausted { attempts, last }) => {
                assert_eq!(attempts, 3);
                assert_eq!(last, 3);
            }
            other => panic!("expected AttemptsExhausted, got {other:?}"),
        }
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    /// Validates that a stop decision on the last attempt is still reported
    /// as non-retryable.
    #[tokio::test]
    async fn test_policy_consulted_before_exhaustion() {
        let executor = RetryExecutor::new(fast_config(1), NeverRetry);
        let result: RetryResult<(), &str> = executor.execute(|| async { Err("fatal") }).await;

        assert!(matches!(result, Err(RetryError::NonRetryable { attempts: 1, error: "fatal" })));
    }

    #[tokio::test]
    async fn test_predicate_policy_stops_on_rejected_error() {
        let counter = Arc::new(AtomicU32::new(0));
        let policy = PredicateRetry::new(|error: &&str, _attempt| *error == "retry");
        let executor = RetryExecutor::new(fast_config(10), policy);

        let result: RetryResult<(), &str> = executor
            .execute(|| {
                let counter = Arc::clone(&counter);
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err("retry")
                    } else {
                        Err("stop")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap_err().attempts(), 2);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    struct AfterPolicy;

    impl RetryPolicy<&'static str> for AfterPolicy {
        fn should_retry(&self, _error: &&'static str, _attempt: u32) -> RetryDecision {
            RetryDecision::RetryAfter(Duration::from_secs(3600))
        }
    }

    /// Validates that server-specified delays are capped by the backoff cap.
    #[tokio::test]
    async fn test_retry_after_is_capped() {
        let config = RetryConfig::builder()
            .max_attempts(2)
            .exponential_backoff(Duration::from_millis(1), 2.0, Duration::from_millis(5))
            .no_jitter()
            .build()
            .unwrap();
        let outcome = RetryExecutor::new(config, AfterPolicy)
            .execute_with_outcome(|| async { Err::<(), _>("busy") })
            .await;

        assert_eq!(outcome.attempts, 2);
        assert_eq!(outcome.total_delay, Duration::from_millis(5));
    }

    /// Validates the total time budget interrupts a hung attempt.
    ///
    /// Assertions:
    /// - The outcome is `TimeoutExceeded` with one attempt
    /// - The executor returns long before the operation would have finished
    #[tokio::test]
    async fn test_time_budget_aborts_in_flight_attempt() {
        let config = RetryConfig::builder()
            .max_attempts(5)
            .fixed_backoff(Duration::from_millis(1))
            .max_total_time(Duration::from_millis(50))
            .build()
            .unwrap();
        let started = std::time::Instant::now();

        let outcome = RetryExecutor::new(config, AlwaysRetry)
            .execute_with_outcome(|| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok::<_, &str>(())
            })
            .await;

        assert!(outcome.timed_out);
        assert!(matches!(outcome.result, Err(RetryError::TimeoutExceeded { attempts: 1, .. })));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    /// Validates cancellation during the backoff sleep.
    #[tokio::test]
    async fn test_cancellation_aborts_pending_sleep() {
        let token = CancellationToken::new();
        let config = RetryConfig::builder()
            .max_attempts(5)
            .fixed_backoff(Duration::from_secs(30))
            .no_jitter()
            .build()
            .unwrap();
        let executor = RetryExecutor::new(config, AlwaysRetry).with_cancellation(token.clone());

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            token.cancel();
        });

        let result: RetryResult<(), &str> = executor.execute(|| async { Err("down") }).await;
        canceller.await.unwrap();

        assert!(matches!(result, Err(RetryError::Cancelled { attempts: 1 })));
    }

    #[tokio::test]
    async fn test_convenience_functions() {
        let result = retry(AlwaysRetry, || async { Ok::<_, &str>(42) }).await;
        assert_eq!(result.unwrap(), 42);

        let result: RetryResult<(), &str> =
            retry_with_policy(fast_config(2), NeverRetry, || async { Err("no") }).await;
        assert_eq!(result.unwrap_err().last_error(), Some(&"no"));
    }
}
