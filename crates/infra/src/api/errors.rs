//! API-specific error types
//!
//! Every failure that leaves the API layer carries the terminal reason and
//! the number of attempts made, so callers can tell "the server said no"
//! apart from "we gave up".

use std::fmt;
use std::time::Duration;

use courier_common::auth::AuthError;
use courier_common::error::{ErrorClassification, ErrorSeverity};
use courier_common::resilience::RetryError;
use courier_domain::CourierError;
use thiserror::Error;

/// What went wrong with a single attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The server answered with a non-success status
    Status,
    /// No response within the request timeout
    Timeout,
    /// Connection refused, reset or dropped mid-body
    Connection,
    /// The request could not be built (bad URL, header, body)
    Malformed,
    /// The credential handed to the executor had already expired
    ExpiredCredential,
    /// A 2xx response whose body reported an RPC or GraphQL error
    Rpc,
}

/// Terminal reason of a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureReason {
    pub kind: FailureKind,
    pub status: Option<u16>,
    pub message: String,
    /// Server-requested wait from a `Retry-After` header.
    pub retry_after: Option<Duration>,
}

impl FailureReason {
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Status,
            status: Some(status),
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self { kind, status: None, message: message.into(), retry_after: None }
    }

    #[must_use]
    pub const fn with_retry_after(mut self, delay: Option<Duration>) -> Self {
        self.retry_after = delay;
        self
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "HTTP {status}: {}", self.message),
            None => write!(f, "{:?}: {}", self.kind, self.message),
        }
    }
}

/// Categories of API errors for logging and caller decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorCategory {
    /// Credential could not be obtained, or the server rejected it (401, 403)
    Authentication,
    /// Rate limiting (429)
    RateLimit,
    /// Server errors (5xx)
    Server,
    /// Client errors (4xx except auth and rate limit), malformed requests
    Client,
    /// Connection failures
    Network,
    /// Request timeout or overall deadline
    Timeout,
    /// Caller cancelled or the client shut down
    Cancelled,
    /// Response body did not match the expected shape
    Decode,
    /// Configuration errors
    Config,
}

/// API operation errors
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("Retries exhausted after {attempts} attempt(s), last failure: {reason}")]
    RetriesExhausted { reason: FailureReason, attempts: u32 },

    #[error("Request failed after {attempts} attempt(s): {reason}")]
    Fatal { reason: FailureReason, attempts: u32 },

    #[error("Deadline exceeded after {attempts} attempt(s)")]
    DeadlineExceeded { attempts: u32 },

    #[error("Cancelled after {attempts} attempt(s)")]
    Cancelled { attempts: u32 },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ApiError {
    /// Get the error category for this error
    pub fn category(&self) -> ApiErrorCategory {
        match self {
            Self::Auth(_) => ApiErrorCategory::Authentication,
            Self::RetriesExhausted { reason, .. } | Self::Fatal { reason, .. } => {
                categorize(reason)
            }
            Self::DeadlineExceeded { .. } => ApiErrorCategory::Timeout,
            Self::Cancelled { .. } => ApiErrorCategory::Cancelled,
            Self::Decode(_) => ApiErrorCategory::Decode,
            Self::Config(_) => ApiErrorCategory::Config,
        }
    }

    /// Attempts made before giving up; `None` when no request was sent.
    pub const fn attempts(&self) -> Option<u32> {
        match self {
            Self::RetriesExhausted { attempts, .. }
            | Self::Fatal { attempts, .. }
            | Self::DeadlineExceeded { attempts }
            | Self::Cancelled { attempts } => Some(*attempts),
            Self::Auth(_) | Self::Decode(_) | Self::Config(_) => None,
        }
    }

    /// Last HTTP status seen, from the API or the authority.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RetriesExhausted { reason, .. } | Self::Fatal { reason, .. } => reason.status,
            Self::Auth(err) => err.status(),
            _ => None,
        }
    }

    /// The terminal failure reason, when one attempt completed.
    pub const fn reason(&self) -> Option<&FailureReason> {
        match self {
            Self::RetriesExhausted { reason, .. } | Self::Fatal { reason, .. } => Some(reason),
            _ => None,
        }
    }
}

fn categorize(reason: &FailureReason) -> ApiErrorCategory {
    match (reason.kind, reason.status) {
        (FailureKind::Timeout, _) => ApiErrorCategory::Timeout,
        (FailureKind::Connection, _) => ApiErrorCategory::Network,
        (FailureKind::ExpiredCredential, _) | (_, Some(401 | 403)) => {
            ApiErrorCategory::Authentication
        }
        (_, Some(429)) => ApiErrorCategory::RateLimit,
        (_, Some(status)) if status >= 500 => ApiErrorCategory::Server,
        _ => ApiErrorCategory::Client,
    }
}

/// Failure of one attempt inside the retry loop.
#[derive(Debug)]
pub(crate) enum AttemptError {
    Retryable(FailureReason),
    Fatal(FailureReason),
    Auth(AuthError),
}

impl From<RetryError<AttemptError>> for ApiError {
    fn from(err: RetryError<AttemptError>) -> Self {
        match err {
            RetryError::AttemptsExhausted { attempts, last } => match last {
                AttemptError::Retryable(reason) => Self::RetriesExhausted { reason, attempts },
                AttemptError::Fatal(reason) => Self::Fatal { reason, attempts },
                AttemptError::Auth(err) => Self::Auth(err),
            },
            RetryError::NonRetryable { attempts, error } => match error {
                AttemptError::Fatal(reason) | AttemptError::Retryable(reason) => {
                    Self::Fatal { reason, attempts }
                }
                AttemptError::Auth(err) => Self::Auth(err),
            },
            RetryError::TimeoutExceeded { attempts, .. } => Self::DeadlineExceeded { attempts },
            RetryError::Cancelled { attempts } => Self::Cancelled { attempts },
            RetryError::InvalidConfiguration { message } => Self::Config(message),
        }
    }
}

impl From<CourierError> for ApiError {
    fn from(err: CourierError) -> Self {
        match err {
            CourierError::Serialization(message) => Self::Decode(message),
            other => Self::Config(other.to_string()),
        }
    }
}

impl ErrorClassification for ApiError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Auth(err) => err.is_retryable(),
            Self::RetriesExhausted { .. } | Self::DeadlineExceeded { .. } => true,
            _ => false,
        }
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Cancelled { .. } => ErrorSeverity::Info,
            Self::RetriesExhausted { .. } | Self::DeadlineExceeded { .. } => {
                ErrorSeverity::Warning
            }
            Self::Config(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::Error,
        }
    }

    fn is_critical(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    fn retry_after(&self) -> Option<Duration> {
        self.reason().and_then(|reason| reason.retry_after)
    }
}
