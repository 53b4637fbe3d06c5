//! # Courier Infrastructure
//!
//! Adapters that touch the outside world.
//!
//! This crate contains:
//! - The reqwest transport and the request executor that classifies responses
//! - The retry wrapper, paginator and RPC helpers built on top of it
//! - The [`ApiClient`] facade tying credentials, cache and transport together
//! - Configuration loading from environment variables and files
//! - Tracing subscriber setup
//!
//! ## Architecture
//! - Builds on `courier-common` for credentials, caching and retry
//! - Uses `courier-domain` types at every public boundary
//! - Contains all "impure" code (network, filesystem, environment)

pub mod api;
pub mod config;
pub mod errors;
pub mod http;
pub mod observability;

// Re-export commonly used items
pub use api::{
    AccessTokenProvider, ApiClient, ApiClientBuilder, ApiError, ApiErrorCategory, Outcome,
    Paginator, RetryOptions,
};
pub use errors::InfraError;
pub use http::{HttpClient, HttpClientBuilder};
pub use observability::{init_tracing, LogFormat};
