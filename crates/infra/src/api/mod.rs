//! Authenticated API access
//!
//! Layers, innermost first:
//!
//! - [`executor`]: one HTTP exchange, bearer header, timeout, classification
//!   into [`Outcome`], single refresh-and-retry on 401
//! - [`retry`]: bounded exponential backoff over the executor
//! - [`paginator`]: lazy record streams over paged list endpoints
//! - [`rpc`]: GraphQL and RPC body helpers
//! - [`client`]: the [`ApiClient`] facade owning all of the above
//!
//! # Compliance
//!
//! - Structured tracing only (no println!)
//! - Timeout on every external call
//! - Secrets never logged; credentials come from a provider, not the caller

pub mod auth;
pub mod client;
pub mod errors;
pub mod executor;
pub mod paginator;
pub mod retry;
pub mod rpc;

pub use auth::{AccessTokenProvider, ManagedCredentialProvider, StaticCredentialProvider};
pub use client::{ApiClient, ApiClientBuilder};
pub use errors::{ApiError, ApiErrorCategory, FailureKind, FailureReason};
pub use executor::{ApiResponse, Outcome, RequestExecutor};
pub use paginator::{Page, Paginator};
pub use retry::{execute_with_options, execute_with_retry, RetryOptions};
