//! Brain store - key/value data plus the user directory
//!
//! The working copy lives in memory; `save` flushes it to the configured
//! backend.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;

use crate::application::errors::StorageError;
use crate::domain::entities::User;
use crate::domain::traits::{Store, UserDirectory};
use crate::infrastructure::database::Database;

/// Serialized brain contents
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BrainData {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub data: BTreeMap<String, serde_json::Value>,
}

enum Backend {
    Memory,
    Json(PathBuf),
    Sqlite(Database),
}

impl Backend {
    fn name(&self) -> &'static str {
        match self {
            Backend::Memory => "memory",
            Backend::Json(_) => "json",
            Backend::Sqlite(_) => "sqlite",
        }
    }
}

/// Store and user directory over one brain
pub struct BrainStore {
    backend: Backend,
    brain: RwLock<BrainData>,
    loaded: AtomicBool,
    saves: AtomicUsize,
}

impl BrainStore {
    fn with_backend(backend: Backend) -> Self {
        Self {
            backend,
            brain: RwLock::new(BrainData::default()),
            loaded: AtomicBool::new(false),
            saves: AtomicUsize::new(0),
        }
    }

    /// Non-durable brain; `save` only counts
    pub fn memory() -> Self {
        Self::with_backend(Backend::Memory)
    }

    /// Brain kept in a single JSON file
    pub fn json(path: impl Into<PathBuf>) -> Self {
        Self::with_backend(Backend::Json(path.into()))
    }

    /// Brain kept in a sqlite database
    pub fn sqlite(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        Ok(Self::with_backend(Backend::Sqlite(Database::new(path.into())?)))
    }

    /// Number of completed `save` calls
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    async fn read_json(path: &PathBuf) -> Result<BrainData, StorageError> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No brain file at {}, starting empty", path.display());
                Ok(BrainData::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn write_json(path: &PathBuf, brain: &BrainData) -> Result<(), StorageError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(brain)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}

#[async_trait]
impl Store for BrainStore {
    async fn load(&self) -> Result<(), StorageError> {
        let data = match &self.backend {
            Backend::Memory => BrainData::default(),
            Backend::Json(path) => Self::read_json(path).await?,
            Backend::Sqlite(db) => db.load_brain()?,
        };

        tracing::info!(
            "Brain loaded from {} backend: {} users, {} keys",
            self.backend.name(),
            data.users.len(),
            data.data.len()
        );
        *self.brain.write().await = data;
        self.loaded.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let brain = self.brain.read().await;
        brain
            .data
            .get(key)
            .map(serde_json::to_string)
            .transpose()
            .map_err(StorageError::from)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let value: serde_json::Value = serde_json::from_str(value)?;
        self.brain.write().await.data.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.brain.write().await.data.remove(key);
        Ok(())
    }

    async fn save(&self) -> Result<(), StorageError> {
        if !self.is_loaded() {
            return Err(StorageError::NotLoaded);
        }

        let brain = self.brain.read().await;
        match &self.backend {
            Backend::Memory => {}
            Backend::Json(path) => Self::write_json(path, &brain).await?,
            Backend::Sqlite(db) => db.save_brain(&brain)?,
        }
        self.saves.fetch_add(1, Ordering::SeqCst);
        tracing::debug!("Brain saved to {} backend", self.backend.name());
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for BrainStore {
    async fn user_for_id(&self, id: &str) -> Option<User> {
        let brain = self.brain.read().await;
        brain.users.iter().find(|u| u.id == id).cloned()
    }

    async fn user_for_name(&self, name: &str) -> Option<User> {
        let name = name.to_lowercase();
        let brain = self.brain.read().await;
        brain
            .users
            .iter()
            .find(|u| u.name.to_lowercase() == name)
            .cloned()
    }

    async fn users(&self) -> Vec<User> {
        self.brain.read().await.users.clone()
    }

    async fn remember(&self, user: User) -> bool {
        let mut brain = self.brain.write().await;
        if let Some(known) = brain.users.iter_mut().find(|u| u.id == user.id) {
            if known.name == user.name {
                return false;
            }
            tracing::debug!("User {} renamed {} -> {}", user.id, known.name, user.name);
            known.name = user.name;
            return true;
        }

        tracing::debug!("Learned user {} ({})", user.name, user.id);
        brain.users.push(user);
        true
    }
}
