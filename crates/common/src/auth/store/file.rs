//! JSON file credential store
//!
//! All credentials live in one JSON object mapping `account/role/session` to
//! the credential blob. Writes go to a sibling temp file that is renamed over
//! the original, so readers never observe a partial file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use courier_domain::{CacheKey, Credential};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

use crate::auth::error::AuthError;
use crate::auth::traits::CredentialStoreTrait;

type Blob = BTreeMap<String, Credential>;

/// Credential store backed by a single JSON file.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), write_lock: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Blob, AuthError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(Blob::new()),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                AuthError::store(format!("corrupt credential file {}: {e}", self.path.display()))
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Blob::new()),
            Err(err) => Err(io_error("read", &self.path, &err)),
        }
    }

    async fn save(&self, blob: &Blob) -> Result<(), AuthError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| io_error("create", parent, &e))?;
        }

        let bytes = serde_json::to_vec_pretty(blob)
            .map_err(|e| AuthError::store(format!("serialize credentials: {e}")))?;
        let tmp = self.path.with_extension("tmp");
        let result = async {
            write_private(&tmp, &bytes).await?;
            tokio::fs::rename(&tmp, &self.path).await.map_err(|e| io_error("rename", &tmp, &e))
        }
        .await;
        if result.is_err() {
            let _ = tokio::fs::remove_file(&tmp).await;
        }
        result
    }
}

/// Write `bytes` to `path`, readable by the owner only from the moment the
/// file is created.
async fn write_private(path: &Path, bytes: &[u8]) -> Result<(), AuthError> {
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(path).await.map_err(|e| io_error("create", path, &e))?;
    // A leftover file keeps its old mode.
    restrict_permissions(path).await?;
    file.write_all(bytes).await.map_err(|e| io_error("write", path, &e))?;
    file.sync_all().await.map_err(|e| io_error("sync", path, &e))
}

fn io_error(op: &str, path: &Path, err: &std::io::Error) -> AuthError {
    AuthError::store(format!("failed to {op} {}: {err}", path.display()))
}

#[cfg(unix)]
async fn restrict_permissions(path: &Path) -> Result<(), AuthError> {
    use std::os::unix::fs::PermissionsExt;

    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .await
        .map_err(|e| io_error("chmod", path, &e))
}

#[cfg(not(unix))]
async fn restrict_permissions(_path: &Path) -> Result<(), AuthError> {
    Ok(())
}

#[async_trait]
impl CredentialStoreTrait for FileCredentialStore {
    async fn store(&self, key: &CacheKey, credential: &Credential) -> Result<(), AuthError> {
        let _guard = self.write_lock.lock().await;
        let mut blob = self.load().await?;
        blob.insert(key.to_string(), credential.clone());
        self.save(&blob).await?;
        debug!(cache_key = %key, path = %self.path.display(), "Credential persisted");
        Ok(())
    }

    async fn retrieve(&self, key: &CacheKey) -> Result<Option<Credential>, AuthError> {
        Ok(self.load().await?.remove(&key.to_string()))
    }

    async fn delete(&self, key: &CacheKey) -> Result<(), AuthError> {
        let _guard = self.write_lock.lock().await;
        let mut blob = self.load().await?;
        if blob.remove(&key.to_string()).is_some() {
            self.save(&blob).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn key(session: &str) -> CacheKey {
        CacheKey::new("111111111111", "Admin", session)
    }

    /// Validates store, retrieve and delete against a real file.
    ///
    /// Assertions:
    /// - Confirms missing parent directories are created.
    /// - Confirms the persisted blob holds `access_token`, `refresh_token`
    ///   and `expires_at`.
    /// - Confirms delete is idempotent.
    #[tokio::test]
    async fn round_trip_through_file() {
        let dir = TempDir::new().expect("temp dir");
        let store = FileCredentialStore::new(dir.path().join("nested/credentials.json"));
        let credential = Credential::with_lifetime("access", 600).with_refresh_token("refresh");

        assert!(store.retrieve(&key("a")).await.expect("empty read").is_none());
        store.store(&key("a"), &credential).await.expect("store");
        store.store(&key("b"), &credential).await.expect("store");

        assert_eq!(store.retrieve(&key("a")).await.expect("read"), Some(credential.clone()));
        assert!(store.has(&key("b")).await);

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(store.path()).expect("file exists"))
                .expect("valid json");
        let entry = &raw["111111111111/Admin/a"];
        assert_eq!(entry["access_token"], "access");
        assert_eq!(entry["refresh_token"], "refresh");
        assert!(entry["expires_at"].is_string());

        store.delete(&key("a")).await.expect("delete");
        store.delete(&key("a")).await.expect("delete again");
        assert!(!store.has(&key("a")).await);
        assert!(store.has(&key("b")).await);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().expect("temp dir");
        let store = FileCredentialStore::new(dir.path().join("credentials.json"));
        store.store(&key("a"), &Credential::with_lifetime("t", 60)).await.expect("store");

        let mode = std::fs::metadata(store.path()).expect("metadata").permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    /// Validates a leftover world-readable temp file does not leak its mode.
    ///
    /// Assertions:
    /// - Confirms the persisted file is `0o600`.
    /// - Confirms the temp file is gone afterwards.
    #[cfg(unix)]
    #[tokio::test]
    async fn leftover_temp_file_is_not_reused_with_loose_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("credentials.json");
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, b"stale").expect("write");
        std::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o644)).expect("chmod");

        let store = FileCredentialStore::new(&path);
        store.store(&key("a"), &Credential::with_lifetime("t", 60)).await.expect("store");

        let mode = std::fs::metadata(&path).expect("metadata").permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert!(!tmp.exists());
    }

    /// Validates a failed rename leaves no temp file behind.
    ///
    /// Assertions:
    /// - Confirms `save` reports a store error when the target is a
    ///   non-empty directory.
    /// - Confirms the temp file was removed.
    #[tokio::test]
    async fn failed_rename_removes_temp_file() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("credentials.json");
        std::fs::create_dir(&path).expect("mkdir");
        std::fs::write(path.join("occupied"), b"x").expect("write");

        let store = FileCredentialStore::new(&path);
        let err = store.save(&Blob::new()).await.expect_err("rename over directory");

        assert!(matches!(err, AuthError::Store(_)));
        assert!(!path.with_extension("tmp").exists());
    }

    #[tokio::test]
    async fn corrupt_file_is_reported() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, b"not json").expect("write");

        let err = FileCredentialStore::new(path).retrieve(&key("a")).await.expect_err("corrupt");
        assert!(matches!(err, AuthError::Store(_)));
    }
}
