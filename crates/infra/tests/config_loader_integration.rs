//! Integration tests for configuration loading
//!
//! **Coverage:**
//! - A TOML file on disk feeds a working client
//! - File values that fail validation are rejected
//! - A JSON file is loaded through an explicit path

use std::fs;

use courier_domain::{CourierError, PaginationStyle, PersistenceSettings};
use courier_infra::config::{load_from_file, ConfigLoader};
use tempfile::TempDir;

const FULL_TOML: &str = r#"
[api]
base_url = "https://api.example.com/v2"
timeout_secs = 15

[auth]
token_url = "https://auth.example.com/oauth/token"
client_id = "courier-cli"
scopes = ["read", "write"]
refresh_threshold_secs = 60

[retry]
max_attempts = 5
base_delay_ms = 100
max_delay_ms = 2000
jitter = false

[pagination]
page_size = 100
style = "cursor"
items_field = "results"

[cache]
max_entries = 32

[persistence]
backend = "file"
path = "/var/lib/courier/credentials.json"
"#;

/// Validates a fully populated TOML file.
///
/// Assertions:
/// - Every section is read
/// - Omitted pagination fields keep their defaults
#[test]
fn loads_full_toml_file() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("courier.toml");
    fs::write(&path, FULL_TOML).expect("write config");

    let config = load_from_file(Some(path)).expect("config loads");

    assert_eq!(config.api.timeout_secs, 15);
    assert_eq!(config.auth.scopes, vec!["read", "write"]);
    assert_eq!(config.retry.max_attempts, 5);
    assert!(!config.retry.jitter);
    assert_eq!(config.pagination.style, PaginationStyle::Cursor);
    assert_eq!(config.pagination.items_field, "results");
    assert_eq!(config.pagination.total_field, "total");
    assert_eq!(config.cache.max_entries, Some(32));
    assert!(matches!(config.persistence, PersistenceSettings::File { .. }));
    assert!(config.validate().is_ok());
}

/// Validates that the loader validates what it read.
///
/// Assertions:
/// - A zero retry budget is rejected with a config error
#[test]
fn loader_rejects_invalid_values() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("courier.toml");
    fs::write(&path, FULL_TOML.replace("max_attempts = 5", "max_attempts = 0"))
        .expect("write config");

    let config = load_from_file(Some(path.clone())).expect("file parses");
    assert!(matches!(config.validate(), Err(CourierError::Config(_))));
}

/// Validates an explicit JSON path through `ConfigLoader`.
///
/// Assertions:
/// - The JSON file is used when the environment does not configure the client
#[test]
fn config_loader_reads_explicit_json_path() {
    if std::env::var_os("COURIER_API_BASE_URL").is_some() {
        // Environment takes precedence; nothing to observe here.
        return;
    }

    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("courier.json");
    fs::write(
        &path,
        r#"{
            "api": { "base_url": "https://api.example.com" },
            "auth": { "token_url": "https://auth.example.com/token", "client_id": "cli" }
        }"#,
    )
    .expect("write config");

    let config = ConfigLoader::new().without_dotenv().with_path(&path).load().expect("loads");
    assert_eq!(config.api.base_url, "https://api.example.com");
    assert_eq!(config.persistence, PersistenceSettings::None);
}

/// Validates a clear error for a missing explicit file.
#[test]
fn missing_file_is_config_error() {
    let dir = TempDir::new().expect("temp dir");
    let err = load_from_file(Some(dir.path().join("absent.toml"))).expect_err("missing");
    assert!(matches!(err, CourierError::Config(msg) if msg.contains("not found")));
}
