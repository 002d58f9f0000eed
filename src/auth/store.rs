//! Credential storage keyed by user id
//!
//! The file store keeps every user's tokens in one JSON map. Concurrent
//! refreshes for the same user are last-write-wins.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::credentials::Credentials;
use crate::Result;

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn load(&self, user_id: &str) -> Result<Option<Credentials>>;

    async fn save(&self, user_id: &str, credentials: &Credentials) -> Result<()>;

    async fn delete(&self, user_id: &str) -> Result<()>;
}

/// JSON file of `user id -> Credentials`
pub struct FileCredentialStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    async fn read_all(&self) -> Result<HashMap<String, Credentials>> {
        if !tokio::fs::try_exists(&self.path).await? {
            return Ok(HashMap::new());
        }
        let content = tokio::fs::read_to_string(&self.path).await?;
        if content.trim().is_empty() {
            return Ok(HashMap::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    async fn write_all(&self, all: &HashMap<String, Credentials>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(all)?;
        tokio::fs::write(&self.path, content).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            tokio::fs::set_permissions(&self.path, perms).await?;
        }

        Ok(())
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load(&self, user_id: &str) -> Result<Option<Credentials>> {
        let _guard = self.lock.lock().await;
        Ok(self.read_all().await?.remove(user_id))
    }

    async fn save(&self, user_id: &str, credentials: &Credentials) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut all = self.read_all().await?;
        all.insert(user_id.to_string(), credentials.clone());
        self.write_all(&all).await
    }

    async fn delete(&self, user_id: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut all = self.read_all().await?;
        if all.remove(user_id).is_some() {
            self.write_all(&all).await?;
        }
        Ok(())
    }
}

/// In-process store, used by tests and ephemeral deployments
#[derive(Default)]
pub struct InMemoryCredentialStore {
    entries: Mutex<HashMap<String, Credentials>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn load(&self, user_id: &str) -> Result<Option<Credentials>> {
        Ok(self.entries.lock().await.get(user_id).cloned())
    }

    async fn save(&self, user_id: &str, credentials: &Credentials) -> Result<()> {
        self.entries
            .lock()
            .await
            .insert(user_id.to_string(), credentials.clone());
        Ok(())
    }

    async fn delete(&self, user_id: &str) -> Result<()> {
        self.entries.lock().await.remove(user_id);
        Ok(())
    }
}
