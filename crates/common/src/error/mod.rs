//! Error classification
//!
//! Every error type in the workspace answers the same questions through
//! [`ErrorClassification`]: is it worth retrying, how loud should the log
//! line be, and did the remote side ask for a specific delay. Retry loops and
//! the client facade consult the trait instead of matching on concrete types.
//!
//! ```rust,ignore
//! impl ErrorClassification for StoreError {
//!     fn is_retryable(&self) -> bool {
//!         matches!(self, Self::Locked)
//!     }
//!     // ...
//! }
//! ```

use std::fmt;
use std::time::Duration;

use courier_domain::CourierError;

/// Error classification trait for consistent error handling across modules
///
/// Retry loops, logging and the client facade all consult this trait instead
/// of matching on concrete error types.
pub trait ErrorClassification {
    /// Check if this error is retryable
    ///
    /// Retryable errors are transient: timeouts, rate limiting, lock
    /// contention, temporary service unavailability.
    fn is_retryable(&self) -> bool;

    /// Get the error severity level
    fn severity(&self) -> ErrorSeverity;

    /// Check if this is a critical error requiring immediate attention
    fn is_critical(&self) -> bool;

    /// Suggested retry delay, e.g. from a `Retry-After` header
    fn retry_after(&self) -> Option<Duration>;
}

/// Error severity levels for logging decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

impl ErrorClassification for CourierError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Network(_) => ErrorSeverity::Warning,
            Self::NotFound(_) => ErrorSeverity::Info,
            Self::Internal(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::Error,
        }
    }

    fn is_critical(&self) -> bool {
        matches!(self, Self::Internal(_))
    }

    fn retry_after(&self) -> Option<Duration> {
        None
    }
}
