//! Macro for implementing Display and FromStr for label enums
//!
//! Configuration files and environment variables refer to enum values by a
//! short lowercase label (`"offset"`, `"cursor"`, `"json"`). This macro
//! generates both directions of that mapping from a single table.
//!
//! # Example
//!
//! ```rust
//! use courier_domain::impl_domain_label_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Backend {
//!     File,
//!     Keychain,
//! }
//!
//! impl_domain_label_conversions!(Backend {
//!     File => "file",
//!     Keychain => "keychain",
//! });
//!
//! assert_eq!(Backend::File.to_string(), "file");
//! assert_eq!("KEYCHAIN".parse::<Backend>(), Ok(Backend::Keychain));
//! ```

/// Implements Display and FromStr traits for label enums
///
/// Labels must be written in lowercase; parsing is case-insensitive and
/// ignores surrounding whitespace.
#[macro_export]
macro_rules! impl_domain_label_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => f.write_str($str),)+
                }
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Transport {
        Https,
        Unix,
    }

    impl_domain_label_conversions!(Transport {
        Https => "https",
        Unix => "unix",
    });

    #[test]
    fn display_uses_label() {
        assert_eq!(Transport::Https.to_string(), "https");
        assert_eq!(Transport::Unix.to_string(), "unix");
    }

    #[test]
    fn parse_is_case_insensitive_and_trims() {
        assert_eq!(Transport::from_str("HTTPS").unwrap(), Transport::Https);
        assert_eq!(Transport::from_str("  Unix ").unwrap(), Transport::Unix);
    }

    #[test]
    fn parse_rejects_unknown_label() {
        let err = Transport::from_str("carrier-pigeon").unwrap_err();
        assert!(err.contains("Invalid Transport: carrier-pigeon"));
    }
}
