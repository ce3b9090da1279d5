// JSON File User Directory
// Users are kept in memory and written back whenever a flag is persisted.
// Memory only changes once the write succeeded.

use async_trait::async_trait;
use hbci_core::domain::{User, UserFlags};
use hbci_core::port::UserDirectory;
use hbci_core::{AppError, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info};

pub struct JsonUserDirectory {
    path: PathBuf,
    users: RwLock<BTreeMap<String, User>>,
}

impl JsonUserDirectory {
    /// Load users from `path`; a missing file starts an empty directory
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let users = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let list: Vec<User> = serde_json::from_slice(&bytes)?;
                list.into_iter().map(|u| (u.id.clone(), u)).collect()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        info!(path = %path.display(), count = users.len(), "User directory opened");
        Ok(Self {
            path,
            users: RwLock::new(users),
        })
    }

    /// Add or replace a user and persist the directory
    pub async fn upsert(&self, user: User) -> Result<()> {
        let mut users = self.users.write().await;
        let mut next = users.clone();
        next.insert(user.id.clone(), user);
        self.persist(&next).await?;
        *users = next;
        Ok(())
    }

    async fn persist(&self, users: &BTreeMap<String, User>) -> Result<()> {
        let list: Vec<&User> = users.values().collect();
        let bytes = serde_json::to_vec_pretty(&list)?;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        // Write to a sibling file first so a crash never leaves a torn directory
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!(path = %self.path.display(), "User directory written");
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for JsonUserDirectory {
    async fn find_user(&self, id: &str) -> Result<Option<User>> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn add_flags(&self, id: &str, flags: UserFlags) -> Result<()> {
        let mut users = self.users.write().await;
        let mut next = users.clone();
        let user = next
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("user {}", id)))?;
        user.flags = user.flags.union(flags);
        self.persist(&next).await?;
        *users = next;
        info!(user = id, ?flags, "User flags added");
        Ok(())
    }
}
