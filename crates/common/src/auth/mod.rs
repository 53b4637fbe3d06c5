//! Authentication: authority client, credential stores and the credential
//! lifecycle manager.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │  CredentialManager   │  authenticate / get_or_refresh / restore / logout
//! └──────────┬───────────┘
//!            │
//!            ├──► AuthorityClientTrait   (token + assume-role endpoints)
//!            ├──► CredentialCache        (in-memory, expiry checked on read)
//!            └──► CredentialStoreTrait   (file or keychain, optional)
//! ```
//!
//! # Usage Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use courier_common::auth::{AuthorityClient, CredentialCache, CredentialManager};
//! use courier_domain::{AuthMethod, AuthSettings, IdentityContext};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = AuthSettings::new("https://auth.example.com/oauth/token", "client-id");
//! let authority = Arc::new(AuthorityClient::new(settings)?);
//! let manager = CredentialManager::new(authority, CredentialCache::new());
//!
//! let context = IdentityContext::new(
//!     "111111111111",
//!     "session",
//!     AuthMethod::Password { username: "Admin".into(), password: "secret".into() },
//! );
//! let credential = manager.get_or_refresh(&context).await?;
//! println!("valid for {}s", credential.seconds_until_expiry());
//! # Ok(())
//! # }
//! ```
//!
//! # Security
//!
//! - PKCE (S256) and constant-time state comparison for the
//!   authorization-code flow
//! - Secrets never appear in `Debug` output or logs
//! - File store writes are owner-only on unix

pub mod client;
pub mod credential_cache;
pub mod credential_manager;
mod error;
pub mod pkce;
pub mod store;
pub mod traits;
pub mod types;

pub use client::AuthorityClient;
pub use credential_cache::CredentialCache;
pub use credential_manager::CredentialManager;
pub use error::AuthError;
pub use pkce::{
    generate_code_challenge, generate_code_verifier, generate_state, validate_state, PKCEChallenge,
};
pub use store::{FileCredentialStore, KeychainCredentialStore};
pub use traits::{AuthorityClientTrait, CredentialStoreTrait};
pub use types::{AssumeRoleRequest, OAuthError, TokenResponse};
