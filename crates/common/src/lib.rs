//! Shared building blocks for the courier API client.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: error classification
//! - `runtime`: async infrastructure (cache, clock, retry executor)
//! - `platform`: authentication (authority client, credential stores,
//!   credential manager)
//! - `test-utils`: mock authority and credential store for downstream tests

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier
// -----------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod error;

// Runtime tier
// --------------------------------------------------------------------
#[cfg(feature = "runtime")]
pub mod cache;
#[cfg(feature = "runtime")]
pub mod resilience;

// Platform tier
// -------------------------------------------------------------------
#[cfg(feature = "platform")]
pub mod auth;

// Testing utilities
// ---------------------------------------------------------------
#[cfg(all(feature = "platform", any(feature = "test-utils", test)))]
pub mod testing;

#[cfg(feature = "platform")]
pub use auth::{AuthError, CredentialCache, CredentialManager};
#[cfg(feature = "foundation")]
pub use error::{ErrorClassification, ErrorSeverity};
#[cfg(feature = "runtime")]
pub use resilience::{
    retry, retry_with_policy, BackoffStrategy, Clock, Jitter, MockClock, RetryConfig,
    RetryConfigBuilder, RetryDecision, RetryError, RetryExecutor, RetryPolicy, RetryResult,
    SharedClock, SystemClock,
};
