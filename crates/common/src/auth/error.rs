//! Authentication errors

use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::error::{ErrorClassification, ErrorSeverity};

/// Failure to produce a credential.
///
/// Never retried by the request retry loop; callers decide whether to
/// re-authenticate.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The authority answered with a non-success status.
    #[error("authority rejected {grant} exchange (HTTP {status}): {message}")]
    Rejected { grant: &'static str, status: u16, message: String },

    /// A role-chain hop failed; later hops were not attempted.
    #[error("role chain hop {index} ({role}) failed: {source}")]
    HopFailed {
        index: usize,
        role: String,
        #[source]
        source: Box<AuthError>,
    },

    #[error("no credential available for {cache_key}")]
    NotAuthenticated { cache_key: String },

    #[error("no refresh token available")]
    NoRefreshToken,

    /// The authority issued a credential that was already expired.
    #[error("authority issued a credential that expired at {expired_at}")]
    ExpiredOnArrival { expired_at: DateTime<Utc> },

    /// CSRF check on the authorization-code callback failed.
    #[error("authorization state mismatch")]
    StateMismatch,

    #[error("{0} is not configured")]
    MissingEndpoint(&'static str),

    #[error("authority request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid authority response: {0}")]
    InvalidResponse(String),

    #[error("credential store error: {0}")]
    Store(String),
}

impl AuthError {
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store(message.into())
    }

    /// HTTP status reported by the authority, looking through hop failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            Self::HopFailed { source, .. } => source.status(),
            Self::Transport(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

impl ErrorClassification for AuthError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Rejected { status, .. } => *status == 429 || *status >= 500,
            Self::HopFailed { source, .. } => source.is_retryable(),
            Self::Transport(err) => err.is_timeout() || err.is_connect(),
            _ => false,
        }
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::StateMismatch => ErrorSeverity::Critical,
            Self::Store(_) => ErrorSeverity::Warning,
            _ => ErrorSeverity::Error,
        }
    }

    fn is_critical(&self) -> bool {
        matches!(self, Self::StateMismatch)
    }

    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

impl From<AuthError> for courier_domain::CourierError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Store(message) => Self::Storage(message),
            other => Self::Auth(other.to_string()),
        }
    }
}
