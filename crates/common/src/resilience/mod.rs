//! Resilience patterns for transient failures
//!
//! - **Retry**: bounded retry with exponential backoff, jitter, a total time
//!   budget and cooperative cancellation.
//! - **Clock**: time abstraction so expiry and backoff logic can be tested
//!   with [`MockClock`].
//!
//! The executor is generic over the error type; callers plug in a
//! [`RetryPolicy`] that classifies their errors.

pub mod clock;
pub mod retry;

pub use clock::{Clock, MockClock, SharedClock, SystemClock};
pub use retry::{
    policies, retry, retry_with_policy, BackoffStrategy, Jitter, RetryConfig, RetryConfigBuilder,
    RetryDecision, RetryError, RetryExecutor, RetryOutcome, RetryPolicy, RetryResult,
};
