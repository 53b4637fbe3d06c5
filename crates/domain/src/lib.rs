//! # Courier Domain
//!
//! Data types shared by every Courier crate.
//!
//! This crate contains:
//! - Credential, role-chain and identity types
//! - Request and pagination descriptors
//! - Client configuration structures and validation
//! - Domain error types and Result definitions
//!
//! ## Architecture
//! - No dependencies on other Courier crates
//! - No I/O: everything here is plain data plus validation

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
