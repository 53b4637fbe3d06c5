//! Short-lived credentials produced by an authentication exchange.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Access credential returned by an authority.
///
/// Serializes to the persisted blob format
/// `{"access_token", "refresh_token", "expires_at"}`; `scope` and
/// `session_name` are only written when present.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_name: Option<String>,
}

impl Credential {
    /// Create a credential that expires at an absolute instant.
    pub fn new(access_token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            expires_at,
            scope: None,
            session_name: None,
        }
    }

    /// Create a credential valid for `lifetime_secs` from now.
    pub fn with_lifetime(access_token: impl Into<String>, lifetime_secs: i64) -> Self {
        Self::new(access_token, Utc::now() + Duration::seconds(lifetime_secs))
    }

    #[must_use]
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    #[must_use]
    pub fn with_session_name(mut self, session_name: impl Into<String>) -> Self {
        self.session_name = Some(session_name.into());
        self
    }

    /// True once `expires_at` has been reached.
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }

    /// True if the credential expires within `threshold_seconds` from now.
    ///
    /// A zero threshold is equivalent to [`Credential::is_expired`].
    pub fn expires_within(&self, threshold_seconds: i64) -> bool {
        self.expires_at - Duration::seconds(threshold_seconds) <= Utc::now()
    }

    /// Seconds until expiry (negative once expired).
    pub fn seconds_until_expiry(&self) -> i64 {
        (self.expires_at - Utc::now()).num_seconds()
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|token| !token.is_empty())
    }

    /// Value for the `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("expires_at", &self.expires_at)
            .field("scope", &self.scope)
            .field("session_name", &self.session_name)
            .finish()
    }
}
