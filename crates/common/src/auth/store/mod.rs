//! Durable credential stores

mod file;
mod keychain;

pub use file::FileCredentialStore;
pub use keychain::KeychainCredentialStore;
