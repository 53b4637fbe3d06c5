//! Wire types exchanged with the authority

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use courier_domain::Credential;
use serde::{Deserialize, Serialize};

/// Standard OAuth 2.0 token response (RFC 6749 §5.1).
///
/// The assume-role endpoint answers with the same shape.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    /// Lifetime in seconds; the configured default applies when absent.
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenResponse {
    /// Convert into a [`Credential`] anchored at `now`.
    pub fn into_credential(self, now: DateTime<Utc>, default_lifetime_secs: i64) -> Credential {
        let lifetime = self.expires_in.unwrap_or(default_lifetime_secs);
        let mut credential = Credential::new(self.access_token, now + Duration::seconds(lifetime));
        credential.refresh_token = self.refresh_token.filter(|token| !token.is_empty());
        credential.scope = self.scope;
        credential
    }
}

/// OAuth error body (RFC 6749 §5.2).
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthError {
    pub error: String,
    pub error_description: Option<String>,
}

impl fmt::Display for OAuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error_description {
            Some(desc) => write!(f, "{}: {}", self.error, desc),
            None => write!(f, "{}", self.error),
        }
    }
}

/// Body posted to the assume-role endpoint for one hop.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AssumeRoleRequest<'a> {
    pub role_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_account: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<&'a str>,
    pub session_name: &'a str,
    pub duration_secs: i64,
}
