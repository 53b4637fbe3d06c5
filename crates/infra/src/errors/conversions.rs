//! Conversions from external infrastructure errors into domain errors.

use courier_domain::CourierError;
use keyring::Error as KeyringError;
use reqwest::Error as HttpError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub CourierError);

impl From<InfraError> for CourierError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<CourierError> for InfraError {
    fn from(value: CourierError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoCourierError {
    fn into_courier(self) -> CourierError;
}

/* -------------------------------------------------------------------------- */
/* keyring::Error → CourierError */
/* -------------------------------------------------------------------------- */

impl IntoCourierError for KeyringError {
    fn into_courier(self) -> CourierError {
        use KeyringError::*;

        let description = self.to_string();

        match self {
            NoEntry => CourierError::NotFound("keychain entry not found".into()),
            BadEncoding(_) => {
                CourierError::Storage("credential in keychain is not valid UTF-8".into())
            }
            TooLong(name, limit) => CourierError::Storage(format!(
                "keychain attribute '{name}' exceeds platform limit ({limit})"
            )),
            Invalid(attr, reason) => {
                CourierError::Storage(format!("keychain attribute '{attr}' is invalid: {reason}"))
            }
            NoStorageAccess(err) => {
                CourierError::Storage(format!("unable to access secure storage: {err}"))
            }
            _ => CourierError::Storage(description),
        }
    }
}

impl From<KeyringError> for InfraError {
    fn from(value: KeyringError) -> Self {
        InfraError(value.into_courier())
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → CourierError */
/* -------------------------------------------------------------------------- */

impl IntoCourierError for HttpError {
    fn into_courier(self) -> CourierError {
        if self.is_timeout() {
            return CourierError::Network("HTTP request timed out".into());
        }

        if self.is_connect() {
            return CourierError::Network("HTTP connection failure".into());
        }

        if self.is_builder() {
            return CourierError::Config(format!("invalid HTTP request: {self}"));
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));

            return match code {
                401 | 403 => CourierError::Auth(message),
                404 => CourierError::NotFound(message),
                400..=499 if code != 429 => CourierError::Validation(message),
                _ => CourierError::Network(message),
            };
        }

        CourierError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_courier())
    }
}

/* -------------------------------------------------------------------------- */
/* serde_json / std::io → CourierError */
/* -------------------------------------------------------------------------- */

impl From<serde_json::Error> for InfraError {
    fn from(value: serde_json::Error) -> Self {
        InfraError(CourierError::Serialization(value.to_string()))
    }
}

impl From<std::io::Error> for InfraError {
    fn from(value: std::io::Error) -> Self {
        let error = match value.kind() {
            std::io::ErrorKind::NotFound => CourierError::NotFound(value.to_string()),
            _ => CourierError::Storage(value.to_string()),
        };
        InfraError(error)
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use reqwest::{Client, StatusCode};
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[test]
    fn keyring_no_entry_maps_to_not_found() {
        let err = KeyringError::NoEntry;
        let mapped: CourierError = InfraError::from(err).into();
        match mapped {
            CourierError::NotFound(msg) => assert!(msg.contains("keychain")),
            other => panic!("expected not found, got {:?}", other),
        }
    }

    #[test]
    fn io_errors_map_by_kind() {
        let missing = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let mapped: CourierError = InfraError::from(missing).into();
        assert!(matches!(mapped, CourierError::NotFound(_)));

        let denied = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let mapped: CourierError = InfraError::from(denied).into();
        assert!(matches!(mapped, CourierError::Storage(_)));
    }

    #[test]
    fn json_errors_map_to_serialization() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let mapped: CourierError = InfraError::from(err).into();
        assert!(matches!(mapped, CourierError::Serialization(_)));
    }

    #[tokio::test]
    async fn http_status_401_maps_to_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(StatusCode::UNAUTHORIZED))
            .mount(&server)
            .await;

        let client = Client::builder().no_proxy().build().unwrap();
        let error = client.get(server.uri()).send().await.unwrap().error_for_status().unwrap_err();

        let mapped: CourierError = InfraError::from(error).into();
        match mapped {
            CourierError::Auth(msg) => assert!(msg.contains("401")),
            other => panic!("expected auth error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn http_status_429_maps_to_network_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(StatusCode::TOO_MANY_REQUESTS))
            .mount(&server)
            .await;

        let client = Client::builder().no_proxy().build().unwrap();
        let error = client.get(server.uri()).send().await.unwrap().error_for_status().unwrap_err();

        let mapped: CourierError = InfraError::from(error).into();
        assert!(matches!(mapped, CourierError::Network(_)));
    }
}
