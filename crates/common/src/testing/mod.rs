//! Test doubles for the authentication seams
//!
//! Available to unit tests and, through the `test-utils` feature, to
//! downstream crates.
//!
//! ```rust
//! use courier_common::resilience::MockClock;
//! use courier_common::testing::MockAuthority;
//!
//! let clock = MockClock::new();
//! let authority = MockAuthority::new(clock.clone()).with_lifetime_secs(600);
//! assert_eq!(authority.call_count(), 0);
//! ```

pub mod mocks;

pub use mocks::{MockAuthority, MockCredentialStore};
