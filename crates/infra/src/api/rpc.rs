//! GraphQL and JSON-RPC style request bodies
//!
//! Both styles report application errors inside a 2xx response. Those are
//! lifted into [`FailureKind::Rpc`] failures so callers never mistake an
//! error envelope for data.

use courier_domain::RequestSpec;
use serde_json::{json, Map, Value};

use super::errors::{FailureKind, FailureReason};

/// `POST path` with a `{"query", "variables"}` body.
pub fn graphql_request(path: &str, query: &str, variables: Option<Value>) -> RequestSpec {
    let mut body = Map::new();
    body.insert("query".to_string(), Value::String(query.to_string()));
    if let Some(variables) = variables {
        body.insert("variables".to_string(), variables);
    }
    RequestSpec::post(path).json(Value::Object(body))
}

/// `POST path` with a `{"method", "params"}` body.
pub fn rpc_request(path: &str, method: &str, params: Value) -> RequestSpec {
    RequestSpec::post(path).json(json!({ "method": method, "params": params }))
}

/// The `data` member of a GraphQL response.
///
/// # Errors
/// A non-empty `errors` array, reported with the first error's message.
pub fn graphql_data(body: Value) -> Result<Value, FailureReason> {
    let mut body = match body {
        Value::Object(map) => map,
        other => return Ok(other),
    };
    if let Some(errors) = body.get("errors").and_then(Value::as_array).filter(|e| !e.is_empty()) {
        let first = errors.first().map(error_message).unwrap_or_default();
        let message = if errors.len() > 1 {
            format!("{first} (and {} more)", errors.len() - 1)
        } else {
            first
        };
        return Err(FailureReason::new(FailureKind::Rpc, message));
    }
    Ok(body.remove("data").unwrap_or(Value::Null))
}

/// The `result` member of an RPC response, or the whole body without one.
///
/// # Errors
/// A non-null `error` member.
pub fn rpc_result(body: Value) -> Result<Value, FailureReason> {
    let mut body = match body {
        Value::Object(map) => map,
        other => return Ok(other),
    };
    match body.get("error") {
        Some(Value::Null) | None => {}
        Some(error) => return Err(FailureReason::new(FailureKind::Rpc, error_message(error))),
    }
    Ok(body.remove("result").unwrap_or(Value::Object(body)))
}

fn error_message(error: &Value) -> String {
    match error {
        Value::String(message) => message.clone(),
        Value::Object(map) => {
            let message = map.get("message").and_then(Value::as_str).unwrap_or("unknown error");
            match map.get("code") {
                Some(code) => format!("{message} (code {code})"),
                None => message.to_string(),
            }
        }
        other => other.to_string(),
    }
}
