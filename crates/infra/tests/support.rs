//! Shared fixtures for the infra integration tests.

use std::sync::Arc;
use std::time::Duration;

use courier_common::testing::MockAuthority;
use courier_domain::{AuthMethod, ClientConfig, IdentityContext};
use courier_infra::{ApiClient, RetryOptions};

pub const ACCOUNT_ID: &str = "111111111111";
pub const ROLE: &str = "Admin";
pub const SESSION: &str = "sess";

/// Configuration pointing the client at a mock server.
pub fn config(base_url: &str) -> ClientConfig {
    let mut config = ClientConfig::new(base_url, "https://auth.invalid/token", "courier-tests");
    config.retry.base_delay_ms = 10;
    config.retry.max_delay_ms = 50;
    config.retry.jitter = false;
    config
}

pub fn identity() -> IdentityContext {
    IdentityContext::new(
        ACCOUNT_ID,
        SESSION,
        AuthMethod::Password { username: ROLE.into(), password: "hunter2".into() },
    )
}

/// Client backed by `authority`, authenticating as [`identity`].
pub fn client(base_url: &str, authority: &Arc<MockAuthority>) -> ApiClient {
    ApiClient::builder()
        .config(config(base_url))
        .identity(identity())
        .authority(authority.clone())
        .build()
        .expect("client should build")
}

/// Fast retry options for tests that count attempts.
pub fn fast_retry(max_attempts: u32) -> RetryOptions {
    RetryOptions::new(max_attempts, Duration::from_millis(10)).without_jitter()
}
