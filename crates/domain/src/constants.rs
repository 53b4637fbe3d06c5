//! Domain-level constants
//!
//! Defaults applied when a configuration section omits a value.

// Transport
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_USER_AGENT: &str = concat!("courier/", env!("CARGO_PKG_VERSION"));

// Credentials
pub const DEFAULT_REFRESH_THRESHOLD_SECS: i64 = 300;
pub const DEFAULT_CREDENTIAL_LIFETIME_SECS: i64 = 3600;
pub const DEFAULT_ROLE_SESSION_SECS: u32 = 3600;

// Retry
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BASE_DELAY_MS: u64 = 200;
pub const DEFAULT_MAX_DELAY_MS: u64 = 10_000;

// Pagination
pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const MAX_PAGE_SIZE: u32 = 1_000;
pub const DEFAULT_ITEMS_FIELD: &str = "items";
pub const DEFAULT_TOTAL_FIELD: &str = "total";
pub const DEFAULT_NEXT_CURSOR_FIELD: &str = "next_cursor";
pub const DEFAULT_OFFSET_PARAM: &str = "offset";
pub const DEFAULT_CURSOR_PARAM: &str = "cursor";
pub const DEFAULT_LIMIT_PARAM: &str = "limit";

// Keychain
pub const DEFAULT_KEYCHAIN_SERVICE: &str = "courier";
