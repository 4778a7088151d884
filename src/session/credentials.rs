//! Persisted transport credentials.
//!
//! The transport owns the credential format; this service only needs to wipe
//! them when the account is explicitly logged out.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Remove every credential stored for this client. Missing data is not an error.
    async fn purge(&self) -> io::Result<()>;
}

/// Credentials kept in `{data_path}/session-{client_id}`
#[derive(Debug, Clone)]
pub struct LocalCredentialStore {
    session_dir: PathBuf,
}

impl LocalCredentialStore {
    pub fn new(data_path: impl AsRef<Path>, client_id: &str) -> Self {
        Self {
            session_dir: data_path.as_ref().join(format!("session-{}", client_id)),
        }
    }

    pub fn session_dir(&self) -> &Path {
        &self.session_dir
    }
}

#[async_trait]
impl CredentialStore for LocalCredentialStore {
    async fn purge(&self) -> io::Result<()> {
        match tokio::fs::remove_dir_all(&self.session_dir).await {
            Ok(()) => {
                tracing::info!(path = %self.session_dir.display(), "Session credentials purged");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_dir_layout() {
        let store = LocalCredentialStore::new("./wa-session", "main");
        assert_eq!(store.session_dir(), Path::new("./wa-session/session-main"));
    }

    #[tokio::test]
    async fn test_purge_removes_directory() {
        let root = tempfile::tempdir().unwrap();
        let store = LocalCredentialStore::new(root.path(), "main");
        tokio::fs::create_dir_all(store.session_dir().join("Default"))
            .await
            .unwrap();
        tokio::fs::write(store.session_dir().join("Default/creds.json"), b"{}")
            .await
            .unwrap();

        store.purge().await.unwrap();
        assert!(!store.session_dir().exists());
    }

    #[tokio::test]
    async fn test_purge_missing_directory_is_ok() {
        let root = tempfile::tempdir().unwrap();
        let store = LocalCredentialStore::new(root.path(), "never-created");
        assert!(store.purge().await.is_ok());
    }
}
