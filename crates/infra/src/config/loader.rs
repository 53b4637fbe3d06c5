//! Configuration loader
//!
//! Loads client configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. Reads a `.env` file into the environment, if one exists
//! 2. Attempts to load from `COURIER_*` environment variables
//! 3. If a required variable is missing, falls back to a config file
//! 4. Supports JSON and TOML formats
//! 5. Validates the result before returning it
//!
//! ## Environment Variables
//! Required:
//! - `COURIER_API_BASE_URL`, `COURIER_AUTH_TOKEN_URL`, `COURIER_AUTH_CLIENT_ID`
//!
//! Optional:
//! - `COURIER_API_TIMEOUT_SECS`, `COURIER_API_USER_AGENT`
//! - `COURIER_AUTH_CLIENT_SECRET`, `COURIER_AUTH_AUTHORIZE_URL`,
//!   `COURIER_AUTH_REDIRECT_URI`, `COURIER_AUTH_ROLE_URL`,
//!   `COURIER_AUTH_SCOPES` (space or comma separated),
//!   `COURIER_AUTH_REFRESH_THRESHOLD_SECS`, `COURIER_AUTH_DEFAULT_LIFETIME_SECS`
//! - `COURIER_RETRY_MAX_ATTEMPTS`, `COURIER_RETRY_BASE_DELAY_MS`,
//!   `COURIER_RETRY_MAX_DELAY_MS`, `COURIER_RETRY_JITTER`
//! - `COURIER_PAGE_SIZE`, `COURIER_PAGINATION_STYLE` (`offset` | `cursor`)
//! - `COURIER_CACHE_MAX_ENTRIES`
//! - `COURIER_PERSISTENCE` (`none` | `file` | `keychain`),
//!   `COURIER_PERSISTENCE_PATH`, `COURIER_KEYCHAIN_SERVICE`
//!
//! ## File Locations
//! The loader tries, in order:
//! 1. An explicit path passed to [`ConfigLoader::with_path`]
//! 2. The path in `COURIER_CONFIG`
//! 3. `courier.toml` / `courier.json` in the current directory and up to two
//!    parents
//! 4. The same names next to the executable

use std::path::{Path, PathBuf};
use std::str::FromStr;

use courier_domain::constants::DEFAULT_KEYCHAIN_SERVICE;
use courier_domain::{
    ApiSettings, AuthSettings, CacheSettings, ClientConfig, CourierError, PaginationSettings,
    PersistenceSettings, Result, RetrySettings,
};

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "COURIER_CONFIG";

const CONFIG_FILE_NAMES: [&str; 2] = ["courier.toml", "courier.json"];

/// Loads and validates a [`ClientConfig`].
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    path: Option<PathBuf>,
    dotenv: bool,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub const fn new() -> Self {
        Self { path: None, dotenv: true }
    }

    /// Use this file when the environment is incomplete.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Skip reading `.env`.
    #[must_use]
    pub const fn without_dotenv(mut self) -> Self {
        self.dotenv = false;
        self
    }

    /// Load with automatic fallback from environment to file.
    ///
    /// # Errors
    /// Returns `CourierError::Config` if:
    /// - Configuration cannot be loaded from either source
    /// - File format is invalid
    /// - Required fields are missing or values are out of range
    pub fn load(&self) -> Result<ClientConfig> {
        if self.dotenv {
            match dotenvy::dotenv() {
                Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env file"),
                Err(err) if err.not_found() => {}
                Err(err) => tracing::warn!(error = %err, "Ignoring unreadable .env file"),
            }
        }

        let config = match load_from_env() {
            Ok(config) => {
                tracing::info!("Configuration loaded from environment variables");
                config
            }
            Err(e) => {
                tracing::debug!(error = ?e, "Failed to load from environment, trying file");
                let path = self
                    .path
                    .clone()
                    .or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from));
                load_from_file(path)?
            }
        };

        config.validate()?;
        Ok(config)
    }
}

/// Load configuration with the default [`ConfigLoader`].
///
/// # Errors
/// See [`ConfigLoader::load`].
pub fn load() -> Result<ClientConfig> {
    ConfigLoader::new().load()
}

/// Load configuration from `COURIER_*` environment variables
///
/// # Errors
/// Returns `CourierError::Config` if required variables are missing
/// or have invalid values.
pub fn load_from_env() -> Result<ClientConfig> {
    from_lookup(|key| std::env::var(key).ok())
}

/// Build a configuration from an arbitrary variable source.
///
/// # Errors
/// As [`load_from_env`].
pub fn from_lookup<F>(get: F) -> Result<ClientConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let vars = Vars(get);

    let mut api = ApiSettings::new(vars.required("COURIER_API_BASE_URL")?);
    if let Some(timeout) = vars.parsed("COURIER_API_TIMEOUT_SECS")? {
        api.timeout_secs = timeout;
    }
    if let Some(agent) = vars.optional("COURIER_API_USER_AGENT") {
        api.user_agent = agent;
    }

    let mut auth = AuthSettings::new(
        vars.required("COURIER_AUTH_TOKEN_URL")?,
        vars.required("COURIER_AUTH_CLIENT_ID")?,
    );
    auth.client_secret = vars.optional("COURIER_AUTH_CLIENT_SECRET");
    auth.authorize_url = vars.optional("COURIER_AUTH_AUTHORIZE_URL");
    auth.redirect_uri = vars.optional("COURIER_AUTH_REDIRECT_URI");
    auth.role_url = vars.optional("COURIER_AUTH_ROLE_URL");
    if let Some(scopes) = vars.optional("COURIER_AUTH_SCOPES") {
        auth.scopes = scopes
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|scope| !scope.is_empty())
            .map(str::to_string)
            .collect();
    }
    if let Some(threshold) = vars.parsed("COURIER_AUTH_REFRESH_THRESHOLD_SECS")? {
        auth.refresh_threshold_secs = threshold;
    }
    if let Some(lifetime) = vars.parsed("COURIER_AUTH_DEFAULT_LIFETIME_SECS")? {
        auth.default_lifetime_secs = lifetime;
    }

    let mut retry = RetrySettings::default();
    if let Some(attempts) = vars.parsed("COURIER_RETRY_MAX_ATTEMPTS")? {
        retry.max_attempts = attempts;
    }
    if let Some(delay) = vars.parsed("COURIER_RETRY_BASE_DELAY_MS")? {
        retry.base_delay_ms = delay;
    }
    if let Some(delay) = vars.parsed("COURIER_RETRY_MAX_DELAY_MS")? {
        retry.max_delay_ms = delay;
    }
    retry.jitter = vars.boolean("COURIER_RETRY_JITTER", retry.jitter);

    let mut pagination = PaginationSettings::default();
    if let Some(size) = vars.parsed("COURIER_PAGE_SIZE")? {
        pagination.page_size = size;
    }
    if let Some(style) = vars.parsed("COURIER_PAGINATION_STYLE")? {
        pagination.style = style;
    }

    let cache = CacheSettings { max_entries: vars.parsed("COURIER_CACHE_MAX_ENTRIES")? };
    let persistence = persistence_from(&vars)?;

    Ok(ClientConfig { api, auth, retry, pagination, cache, persistence })
}

fn persistence_from<F>(vars: &Vars<F>) -> Result<PersistenceSettings>
where
    F: Fn(&str) -> Option<String>,
{
    let backend = vars.optional("COURIER_PERSISTENCE").unwrap_or_default();
    match backend.trim().to_ascii_lowercase().as_str() {
        "" | "none" => Ok(PersistenceSettings::None),
        "file" => Ok(PersistenceSettings::File {
            path: PathBuf::from(vars.required("COURIER_PERSISTENCE_PATH")?),
        }),
        "keychain" => Ok(PersistenceSettings::Keychain {
            service: vars
                .optional("COURIER_KEYCHAIN_SERVICE")
                .unwrap_or_else(|| DEFAULT_KEYCHAIN_SERVICE.to_string()),
        }),
        other => Err(CourierError::Config(format!("Invalid COURIER_PERSISTENCE: {other}"))),
    }
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `CourierError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<ClientConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(CourierError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            CourierError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| CourierError::Config(format!("Failed to read config file: {}", e)))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
///
/// # Errors
/// Returns `CourierError::Config` if format is invalid or parsing fails.
pub fn parse_config(contents: &str, path: &Path) -> Result<ClientConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| CourierError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| CourierError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(CourierError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// Probe the standard locations for a configuration file
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut dirs = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        dirs.extend(cwd.ancestors().take(3).map(Path::to_path_buf));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            dirs.push(exe_dir.to_path_buf());
        }
    }

    dirs.iter()
        .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.exists())
}

/// Typed access to a variable source.
struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.trim().is_empty())
    }

    fn required(&self, key: &str) -> Result<String> {
        self.optional(key).ok_or_else(|| {
            CourierError::Config(format!("Missing required environment variable: {}", key))
        })
    }

    fn parsed<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.optional(key)
            .map(|raw| {
                raw.trim()
                    .parse::<T>()
                    .map_err(|e| CourierError::Config(format!("Invalid {}: {}", key, e)))
            })
            .transpose()
    }

    /// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off`
    /// (case-insensitive)
    fn boolean(&self, key: &str, default: bool) -> bool {
        self.optional(key)
            .map(|s| matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use courier_domain::PaginationStyle;
    use tempfile::NamedTempFile;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("COURIER_API_BASE_URL", "https://api.example.com/v1"),
        ("COURIER_AUTH_TOKEN_URL", "https://auth.example.com/oauth/token"),
        ("COURIER_AUTH_CLIENT_ID", "courier-cli"),
    ];

    #[test]
    fn test_from_lookup_required_only() {
        let config = from_lookup(lookup(&REQUIRED)).unwrap();
        assert_eq!(config.api.base_url, "https://api.example.com/v1");
        assert_eq!(config.auth.client_id, "courier-cli");
        assert_eq!(config.retry, RetrySettings::default());
        assert_eq!(config.persistence, PersistenceSettings::None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup_all_optional_vars() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([
            ("COURIER_API_TIMEOUT_SECS", "12"),
            ("COURIER_AUTH_SCOPES", "read, write admin"),
            ("COURIER_AUTH_ROLE_URL", "https://sts.example.com/assume"),
            ("COURIER_AUTH_REFRESH_THRESHOLD_SECS", "120"),
            ("COURIER_RETRY_MAX_ATTEMPTS", "5"),
            ("COURIER_RETRY_JITTER", "off"),
            ("COURIER_PAGE_SIZE", "25"),
            ("COURIER_PAGINATION_STYLE", "Cursor"),
            ("COURIER_CACHE_MAX_ENTRIES", "64"),
            ("COURIER_PERSISTENCE", "file"),
            ("COURIER_PERSISTENCE_PATH", "/tmp/courier/credentials.json"),
        ]);

        let config = from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.api.timeout_secs, 12);
        assert_eq!(config.auth.scopes, vec!["read", "write", "admin"]);
        assert_eq!(config.auth.refresh_threshold_secs, 120);
        assert_eq!(config.retry.max_attempts, 5);
        assert!(!config.retry.jitter);
        assert_eq!(config.pagination.page_size, 25);
        assert_eq!(config.pagination.style, PaginationStyle::Cursor);
        assert_eq!(config.cache.max_entries, Some(64));
        assert_eq!(
            config.persistence,
            PersistenceSettings::File { path: PathBuf::from("/tmp/courier/credentials.json") }
        );
    }

    #[test]
    fn test_from_lookup_missing_var() {
        let err = from_lookup(lookup(&REQUIRED[..2])).unwrap_err();
        assert_eq!(
            err,
            CourierError::Config(
                "Missing required environment variable: COURIER_AUTH_CLIENT_ID".to_string()
            )
        );
    }

    #[test]
    fn test_from_lookup_invalid_number() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("COURIER_RETRY_MAX_ATTEMPTS", "lots"));
        let err = from_lookup(lookup(&pairs)).unwrap_err();
        assert!(err.to_string().contains("COURIER_RETRY_MAX_ATTEMPTS"));
    }

    #[test]
    fn test_from_lookup_keychain_defaults_service() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("COURIER_PERSISTENCE", "keychain"));
        let config = from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(
            config.persistence,
            PersistenceSettings::Keychain { service: DEFAULT_KEYCHAIN_SERVICE.to_string() }
        );

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("COURIER_PERSISTENCE", "s3"));
        assert!(from_lookup(lookup(&pairs)).is_err());
    }

    #[test]
    fn test_boolean_parsing() {
        let vars = Vars(lookup(&[("A", "YES"), ("B", "0"), ("C", "On")]));
        assert!(vars.boolean("A", false));
        assert!(!vars.boolean("B", true));
        assert!(vars.boolean("C", false));
        assert!(vars.boolean("MISSING", true));
    }

    #[test]
    fn test_load_from_file_toml() {
        let toml_content = r#"
[api]
base_url = "https://api.example.com"

[auth]
token_url = "https://auth.example.com/token"
client_id = "cli"
scopes = ["read"]

[retry]
max_attempts = 4

[persistence]
backend = "keychain"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        let path = temp_file.path().with_extension("toml");
        std::fs::copy(temp_file.path(), &path).unwrap();

        let config = load_from_file(Some(path.clone())).expect("Should load TOML file");
        assert_eq!(config.retry.max_attempts, 4);
        assert_eq!(config.retry.base_delay_ms, 200);
        assert_eq!(
            config.persistence,
            PersistenceSettings::Keychain { service: DEFAULT_KEYCHAIN_SERVICE.to_string() }
        );

        // Cleanup
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_from_file_not_found() {
        let result = load_from_file(Some(PathBuf::from("/nonexistent/courier.json")));
        assert!(matches!(result, Err(CourierError::Config(_))));
    }

    #[test]
    fn test_parse_config_json() {
        let json_content = r#"{
            "api": { "base_url": "https://api.example.com" },
            "auth": { "token_url": "https://auth.example.com/token", "client_id": "cli" },
            "pagination": { "page_size": 10, "style": "cursor" }
        }"#;

        let config = parse_config(json_content, Path::new("courier.json")).unwrap();
        assert_eq!(config.pagination.page_size, 10);
        assert_eq!(config.pagination.style, PaginationStyle::Cursor);
    }

    #[test]
    fn test_parse_config_rejects_unknown_keys() {
        let json_content = r#"{
            "api": { "base_url": "https://api.example.com", "retries": 9 },
            "auth": { "token_url": "https://auth.example.com/token", "client_id": "cli" }
        }"#;
        assert!(parse_config(json_content, Path::new("courier.json")).is_err());
    }

    #[test]
    fn test_parse_config_unsupported_format() {
        let result = parse_config("some content", Path::new("courier.yaml"));
        assert!(result.is_err(), "Should fail with unsupported format");
    }
}
