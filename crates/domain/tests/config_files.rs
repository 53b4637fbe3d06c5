//! Integration tests for configuration documents
//!
//! Parses complete TOML and JSON documents the way the config loader will
//! and checks that defaults, tagged sections and validation line up.

use courier_domain::{ClientConfig, PaginationStyle, PersistenceSettings};

const FULL_TOML: &str = r#"
[api]
base_url = "https://api.example.com/v1"
timeout_secs = 10

[auth]
token_url = "https://auth.example.com/oauth/token"
client_id = "courier-cli"
role_url = "https://sts.example.com/assume"
scopes = ["read", "write"]

[retry]
max_attempts = 5
base_delay_ms = 100

[pagination]
style = "cursor"
page_size = 25
items_field = "data"

[persistence]
backend = "file"
path = "/tmp/courier/credentials.json"
"#;

/// Validates a fully populated TOML document.
///
/// Assertions:
/// - Every section is read and omitted keys fall back to defaults
/// - The document passes validation
#[test]
fn parses_full_toml_document() {
    let config: ClientConfig = toml::from_str(FULL_TOML).unwrap();

    assert_eq!(config.api.timeout_secs, 10);
    assert_eq!(config.auth.scope_string(), "read write");
    assert_eq!(config.retry.max_attempts, 5);
    assert_eq!(config.retry.max_delay_ms, 10_000);
    assert_eq!(config.pagination.style, PaginationStyle::Cursor);
    assert_eq!(config.pagination.items_field, "data");
    assert_eq!(config.pagination.total_field, "total");
    assert!(matches!(config.persistence, PersistenceSettings::File { .. }));
    assert!(config.validate().is_ok());
}

/// Validates the minimal JSON form.
///
/// Assertions:
/// - Only `api.base_url`, `auth.token_url` and `auth.client_id` are needed
/// - Keychain persistence picks up its default service name
#[test]
fn parses_minimal_json_document() {
    let raw = r#"{
        "api": {"base_url": "https://api.example.com"},
        "auth": {"token_url": "https://auth.example.com/token", "client_id": "x"},
        "persistence": {"backend": "keychain"}
    }"#;
    let config: ClientConfig = serde_json::from_str(raw).unwrap();

    assert_eq!(config.persistence, PersistenceSettings::Keychain { service: "courier".into() });
    assert!(config.validate().is_ok());
}

/// Validates that unknown keys are rejected instead of silently ignored.
#[test]
fn rejects_unknown_keys() {
    let raw = r#"
[api]
base_url = "https://api.example.com"
retries = 3

[auth]
token_url = "https://auth.example.com/token"
client_id = "x"
"#;
    assert!(toml::from_str::<ClientConfig>(raw).is_err());
}

/// Validates that a document missing a required section does not parse.
#[test]
fn missing_auth_section_fails() {
    let raw = r#"
[api]
base_url = "https://api.example.com"
"#;
    let err = toml::from_str::<ClientConfig>(raw).unwrap_err();
    assert!(err.to_string().contains("auth"));
}
