//! Client configuration structures
//!
//! Every recognised key is a field here; unknown keys in a config file are
//! rejected by serde. [`ClientConfig::validate`] runs before any client is
//! built so a missing endpoint or a nonsensical retry budget fails at
//! construction instead of on the first request.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::constants::{
    DEFAULT_BASE_DELAY_MS, DEFAULT_CREDENTIAL_LIFETIME_SECS, DEFAULT_CURSOR_PARAM,
    DEFAULT_ITEMS_FIELD, DEFAULT_KEYCHAIN_SERVICE, DEFAULT_LIMIT_PARAM, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_MAX_DELAY_MS, DEFAULT_NEXT_CURSOR_FIELD, DEFAULT_OFFSET_PARAM, DEFAULT_PAGE_SIZE,
    DEFAULT_REFRESH_THRESHOLD_SECS, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_TOTAL_FIELD,
    DEFAULT_USER_AGENT, MAX_PAGE_SIZE,
};
use crate::errors::{CourierError, Result};
use crate::types::PaginationStyle;

/// Top-level client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    pub api: ApiSettings,
    pub auth: AuthSettings,
    #[serde(default)]
    pub retry: RetrySettings,
    #[serde(default)]
    pub pagination: PaginationSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub persistence: PersistenceSettings,
}

impl ClientConfig {
    /// Configuration with the two required endpoints and defaults elsewhere.
    pub fn new(
        base_url: impl Into<String>,
        token_url: impl Into<String>,
        client_id: impl Into<String>,
    ) -> Self {
        Self {
            api: ApiSettings::new(base_url),
            auth: AuthSettings::new(token_url, client_id),
            retry: RetrySettings::default(),
            pagination: PaginationSettings::default(),
            cache: CacheSettings::default(),
            persistence: PersistenceSettings::default(),
        }
    }

    /// Check required fields and value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`CourierError::Config`] naming the first offending key.
    pub fn validate(&self) -> Result<()> {
        self.api.validate()?;
        self.auth.validate()?;
        self.retry.validate()?;
        self.pagination.validate()?;
        self.persistence.validate()
    }
}

/// `[api]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiSettings {
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl ApiSettings {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn validate(&self) -> Result<()> {
        require_url("api.base_url", &self.base_url)?;
        if self.timeout_secs == 0 {
            return Err(CourierError::Config("api.timeout_secs must be greater than 0".into()));
        }
        Ok(())
    }
}

/// `[auth]` section.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthSettings {
    pub token_url: String,
    pub client_id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub authorize_url: Option<String>,
    #[serde(default)]
    pub redirect_uri: Option<String>,
    /// Assume-role endpoint used to walk role chains.
    #[serde(default)]
    pub role_url: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default = "default_refresh_threshold_secs")]
    pub refresh_threshold_secs: i64,
    /// Lifetime assumed when the authority omits `expires_in`.
    #[serde(default = "default_lifetime_secs")]
    pub default_lifetime_secs: i64,
}

impl AuthSettings {
    pub fn new(token_url: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            token_url: token_url.into(),
            client_id: client_id.into(),
            client_secret: None,
            authorize_url: None,
            redirect_uri: None,
            role_url: None,
            scopes: Vec::new(),
            refresh_threshold_secs: DEFAULT_REFRESH_THRESHOLD_SECS,
            default_lifetime_secs: DEFAULT_CREDENTIAL_LIFETIME_SECS,
        }
    }

    pub fn scope_string(&self) -> String {
        self.scopes.join(" ")
    }

    fn validate(&self) -> Result<()> {
        require_url("auth.token_url", &self.token_url)?;
        if self.client_id.trim().is_empty() {
            return Err(CourierError::Config("auth.client_id is required".into()));
        }
        for (key, value) in [
            ("auth.authorize_url", &self.authorize_url),
            ("auth.redirect_uri", &self.redirect_uri),
            ("auth.role_url", &self.role_url),
        ] {
            if let Some(value) = value {
                require_url(key, value)?;
            }
        }
        if self.refresh_threshold_secs < 0 {
            return Err(CourierError::Config("auth.refresh_threshold_secs must be >= 0".into()));
        }
        if self.default_lifetime_secs <= 0 {
            return Err(CourierError::Config("auth.default_lifetime_secs must be > 0".into()));
        }
        Ok(())
    }
}

impl std::fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSettings")
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .field("authorize_url", &self.authorize_url)
            .field("redirect_uri", &self.redirect_uri)
            .field("role_url", &self.role_url)
            .field("scopes", &self.scopes)
            .field("refresh_threshold_secs", &self.refresh_threshold_secs)
            .field("default_lifetime_secs", &self.default_lifetime_secs)
            .finish()
    }
}

/// `[retry]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter: bool,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
            jitter: true,
        }
    }
}

impl RetrySettings {
    pub const fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub const fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(CourierError::Config("retry.max_attempts must be at least 1".into()));
        }
        if self.max_delay_ms < self.base_delay_ms {
            return Err(CourierError::Config(
                "retry.max_delay_ms must be >= retry.base_delay_ms".into(),
            ));
        }
        Ok(())
    }
}

/// `[pagination]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct PaginationSettings {
    pub page_size: u32,
    pub style: PaginationStyle,
    /// Response field holding the page's records.
    pub items_field: String,
    /// Response field holding the server-reported total.
    pub total_field: String,
    /// Response field holding the continuation token.
    pub next_cursor_field: String,
    pub offset_param: String,
    pub cursor_param: String,
    pub limit_param: String,
}

impl Default for PaginationSettings {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            style: PaginationStyle::default(),
            items_field: DEFAULT_ITEMS_FIELD.to_string(),
            total_field: DEFAULT_TOTAL_FIELD.to_string(),
            next_cursor_field: DEFAULT_NEXT_CURSOR_FIELD.to_string(),
            offset_param: DEFAULT_OFFSET_PARAM.to_string(),
            cursor_param: DEFAULT_CURSOR_PARAM.to_string(),
            limit_param: DEFAULT_LIMIT_PARAM.to_string(),
        }
    }
}

impl PaginationSettings {
    fn validate(&self) -> Result<()> {
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(CourierError::Config(format!(
                "pagination.page_size must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        if self.items_field.is_empty() {
            return Err(CourierError::Config("pagination.items_field must not be empty".into()));
        }
        Ok(())
    }
}

/// `[cache]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct CacheSettings {
    /// Upper bound on cached credentials; unbounded when absent.
    pub max_entries: Option<usize>,
}

/// `[persistence]` section: where credentials survive restarts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum PersistenceSettings {
    #[default]
    None,
    File {
        path: PathBuf,
    },
    Keychain {
        #[serde(default = "default_keychain_service")]
        service: String,
    },
}

impl PersistenceSettings {
    fn validate(&self) -> Result<()> {
        match self {
            Self::File { path } if path.as_os_str().is_empty() => {
                Err(CourierError::Config("persistence.path must not be empty".into()))
            }
            Self::Keychain { service } if service.trim().is_empty() => {
                Err(CourierError::Config("persistence.service must not be empty".into()))
            }
            _ => Ok(()),
        }
    }
}

fn require_url(key: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(CourierError::Config(format!("{key} is required")));
    }
    let parsed = Url::parse(value)
        .map_err(|e| CourierError::Config(format!("{key} is not a valid URL: {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(CourierError::Config(format!("{key} must use http or https")));
    }
    Ok(())
}

const fn default_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

const fn default_refresh_threshold_secs() -> i64 {
    DEFAULT_REFRESH_THRESHOLD_SECS
}

const fn default_lifetime_secs() -> i64 {
    DEFAULT_CREDENTIAL_LIFETIME_SECS
}

fn default_keychain_service() -> String {
    DEFAULT_KEYCHAIN_SERVICE.to_string()
}
