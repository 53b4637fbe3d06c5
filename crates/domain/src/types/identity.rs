//! Identity contexts: who is authenticating and with which secret.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::role_chain::RoleChain;

/// Long-lived secret exchanged for a [`Credential`](super::Credential).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum AuthMethod {
    Password { username: String, password: String },
    ApiKey { key_id: String, secret: String },
    AuthorizationCode { code: String, state: String },
    RefreshToken { refresh_token: String },
    /// Authenticate with `source`, then walk `chain`.
    RoleChain { source: Box<AuthMethod>, chain: RoleChain },
}

impl AuthMethod {
    /// Short label used in logs and cache keys.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Password { .. } => "password",
            Self::ApiKey { .. } => "api_key",
            Self::AuthorizationCode { .. } => "authorization_code",
            Self::RefreshToken { .. } => "refresh_token",
            Self::RoleChain { .. } => "role_chain",
        }
    }
}

impl fmt::Debug for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Password { username, .. } => f
                .debug_struct("Password")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Self::ApiKey { key_id, .. } => f
                .debug_struct("ApiKey")
                .field("key_id", key_id)
                .field("secret", &"<redacted>")
                .finish(),
            Self::AuthorizationCode { state, .. } => f
                .debug_struct("AuthorizationCode")
                .field("code", &"<redacted>")
                .field("state", state)
                .finish(),
            Self::RefreshToken { .. } => {
                f.debug_struct("RefreshToken").field("refresh_token", &"<redacted>").finish()
            }
            Self::RoleChain { source, chain } => {
                f.debug_struct("RoleChain").field("source", source).field("chain", chain).finish()
            }
        }
    }
}

/// Cache identity of a credential: `(account_id, role_name, session_name)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey {
    pub account_id: String,
    pub role_name: String,
    pub session_name: String,
}

impl CacheKey {
    pub fn new(
        account_id: impl Into<String>,
        role_name: impl Into<String>,
        session_name: impl Into<String>,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            role_name: role_name.into(),
            session_name: session_name.into(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.account_id, self.role_name, self.session_name)
    }
}

/// Everything the credential manager needs to produce a credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityContext {
    /// Account the source secret belongs to.
    pub account_id: String,
    pub session_name: String,
    pub method: AuthMethod,
}

impl IdentityContext {
    pub fn new(
        account_id: impl Into<String>,
        session_name: impl Into<String>,
        method: AuthMethod,
    ) -> Self {
        Self { account_id: account_id.into(), session_name: session_name.into(), method }
    }

    /// Role the resulting credential acts as.
    ///
    /// For role chains this is the terminal hop; otherwise the principal
    /// that owns the secret.
    pub fn role_name(&self) -> &str {
        match &self.method {
            AuthMethod::Password { username, .. } => username,
            AuthMethod::ApiKey { key_id, .. } => key_id,
            AuthMethod::RoleChain { chain, .. } => &chain.terminal().role_name,
            AuthMethod::AuthorizationCode { .. } | AuthMethod::RefreshToken { .. } => {
                self.method.label()
            }
        }
    }

    /// Account the resulting credential acts in.
    pub fn effective_account(&self) -> &str {
        match &self.method {
            AuthMethod::RoleChain { chain, .. } => {
                chain.target_account().unwrap_or(&self.account_id)
            }
            _ => &self.account_id,
        }
    }

    pub fn cache_key(&self) -> CacheKey {
        CacheKey::new(self.effective_account(), self.role_name(), &self.session_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RoleHop;

    fn chained() -> IdentityContext {
        let chain = RoleChain::new(vec![
            RoleHop::new("OrgAccess").in_account("111111111111"),
            RoleHop::new("Admin"),
        ])
        .unwrap();
        IdentityContext::new(
            "000000000000",
            "sess",
            AuthMethod::RoleChain {
                source: Box::new(AuthMethod::ApiKey { key_id: "AKID".into(), secret: "s".into() }),
                chain,
            },
        )
    }

    #[test]
    fn role_chain_key_uses_target_account_and_terminal_role() {
        assert_eq!(chained().cache_key(), CacheKey::new("111111111111", "Admin", "sess"));
    }

    #[test]
    fn direct_methods_key_on_source_account() {
        let ctx = IdentityContext::new(
            "acct",
            "cli",
            AuthMethod::Password { username: "ada".into(), password: "pw".into() },
        );
        assert_eq!(ctx.cache_key().to_string(), "acct/ada/cli");

        let ctx = IdentityContext::new(
            "acct",
            "cli",
            AuthMethod::RefreshToken { refresh_token: "r".into() },
        );
        assert_eq!(ctx.role_name(), "refresh_token");
    }

    #[test]
    fn debug_redacts_nested_secrets() {
        let rendered = format!("{:?}", chained());
        assert!(rendered.contains("AKID"));
        assert!(!rendered.contains("secret: \"s\""));
    }

    #[test]
    fn context_deserializes_from_tagged_json() {
        let raw = r#"{
            "account_id": "acct",
            "session_name": "batch",
            "method": {"method": "api_key", "key_id": "id", "secret": "sec"}
        }"#;
        let ctx: IdentityContext = serde_json::from_str(raw).unwrap();
        assert_eq!(ctx.method.label(), "api_key");
        assert_eq!(ctx.role_name(), "id");
    }
}
