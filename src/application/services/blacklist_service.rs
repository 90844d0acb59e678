//! Blacklist of user ids excluded from mention broadcasts

use std::sync::Arc;

use crate::application::errors::{BlacklistError, StorageError};
use crate::domain::entities::User;
use crate::domain::traits::{Store, UserDirectory};

/// Store key holding the JSON array of blacklisted ids
pub const BLACKLIST_KEY: &str = "blacklist";

/// Owns the blacklist and mirrors every change to the store
pub struct BlacklistService {
    store: Arc<dyn Store>,
    directory: Arc<dyn UserDirectory>,
    entries: Vec<String>,
    loaded: bool,
}

impl BlacklistService {
    pub fn new(store: Arc<dyn Store>, directory: Arc<dyn UserDirectory>) -> Self {
        Self {
            store,
            directory,
            entries: Vec::new(),
            loaded: false,
        }
    }

    /// Read the persisted blacklist. Fails open: a missing or unreadable
    /// entry leaves the blacklist empty.
    pub async fn load(&mut self) -> Result<(), StorageError> {
        if !self.store.is_loaded() {
            return Err(StorageError::NotLoaded);
        }

        self.entries = match self.store.get(BLACKLIST_KEY).await? {
            Some(raw) => match serde_json::from_str::<Vec<String>>(&raw) {
                Ok(stored) => {
                    let mut entries: Vec<String> = Vec::with_capacity(stored.len());
                    for id in stored {
                        if !entries.contains(&id) {
                            entries.push(id);
                        }
                    }
                    tracing::info!("Blacklist loaded successfully ({} entries)", entries.len());
                    entries
                }
                Err(e) => {
                    tracing::warn!("Failed to load blacklist: {}", e);
                    Vec::new()
                }
            },
            None => {
                tracing::warn!("Failed to load blacklist: no stored entry");
                Vec::new()
            }
        };
        self.loaded = true;
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn is_blacklisted(&self, id: &str) -> bool {
        self.entries.iter().any(|e| e == id)
    }

    /// Add an id. Returns false (and skips the save) if it was already present.
    pub async fn add(&mut self, id: &str) -> Result<bool, BlacklistError> {
        if !self.loaded {
            return Err(BlacklistError::NotReady);
        }
        if self.is_blacklisted(id) {
            tracing::debug!("{} is already blacklisted", id);
            return Ok(false);
        }

        let mut candidate = self.entries.clone();
        candidate.push(id.to_string());
        self.persist(candidate).await?;
        Ok(true)
    }

    pub async fn remove(&mut self, id: &str) -> Result<(), BlacklistError> {
        if !self.loaded {
            return Err(BlacklistError::NotReady);
        }
        let Some(index) = self.entries.iter().position(|e| e == id) else {
            tracing::warn!("Unable to find {} in blacklist", id);
            return Err(BlacklistError::NotFound(id.to_string()));
        };

        let mut candidate = self.entries.clone();
        candidate.remove(index);
        self.persist(candidate).await?;
        tracing::info!("Removed {} from blacklist", id);
        Ok(())
    }

    /// Find a user by display name, accepting `@Name` and surrounding whitespace
    pub async fn resolve_by_name(&self, name: &str) -> Option<User> {
        let name = normalize_name(name);
        self.directory
            .user_for_name(name)
            .await
            .filter(User::has_id)
    }

    pub async fn resolve_by_id(&self, id: &str) -> Option<User> {
        self.directory
            .user_for_id(id.trim())
            .await
            .filter(User::has_id)
    }

    /// Save `candidate` and adopt it only once the store confirms the write.
    /// A failed save restores the previous stored value.
    async fn persist(&mut self, candidate: Vec<String>) -> Result<(), StorageError> {
        tracing::info!("Saving blacklist");
        let raw = serde_json::to_string(&candidate)?;
        let previous = self.store.get(BLACKLIST_KEY).await?;
        self.store.set(BLACKLIST_KEY, &raw).await?;

        if let Err(e) = self.store.save().await {
            let restored = match &previous {
                Some(old) => self.store.set(BLACKLIST_KEY, old).await,
                None => self.store.delete(BLACKLIST_KEY).await,
            };
            if let Err(restore_err) = restored {
                tracing::error!("Failed to restore blacklist after save error: {}", restore_err);
            }
            return Err(e);
        }

        self.entries = candidate;
        Ok(())
    }
}

/// Trim and drop a single leading mention sigil
pub fn normalize_name(name: &str) -> &str {
    let name = name.trim();
    name.strip_prefix('@').unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::storage::BrainStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Brain whose saves fail while `broken` is set
    struct FlakyStore {
        inner: BrainStore,
        broken: AtomicBool,
    }

    #[async_trait]
    impl Store for FlakyStore {
        async fn load(&self) -> Result<(), StorageError> {
            self.inner.load().await
        }

        fn is_loaded(&self) -> bool {
            self.inner.is_loaded()
        }

        async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            self.inner.set(key, value).await
        }

        async fn delete(&self, key: &str) -> Result<(), StorageError> {
            self.inner.delete(key).await
        }

        async fn save(&self) -> Result<(), StorageError> {
            if self.broken.load(Ordering::SeqCst) {
                return Err(StorageError::Io(std::io::Error::other("disk full")));
            }
            self.inner.save().await
        }
    }

    async fn loaded_service(users: &[(&str, &str)]) -> (Arc<BrainStore>, BlacklistService) {
        let brain = Arc::new(BrainStore::memory());
        brain.load().await.unwrap();
        for (id, name) in users {
            brain.remember(User::new(*id, *name)).await;
        }
        let mut service = BlacklistService::new(brain.clone(), brain.clone());
        service.load().await.unwrap();
        (brain, service)
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("@Alice"), "Alice");
        assert_eq!(normalize_name("  Alice "), "Alice");
        assert_eq!(normalize_name(" @@Bob"), "@Bob");
    }

    #[tokio::test]
    async fn test_mutation_before_load_is_rejected() {
        let brain = Arc::new(BrainStore::memory());
        let mut service = BlacklistService::new(brain.clone(), brain.clone());

        assert!(matches!(service.add("1").await, Err(BlacklistError::NotReady)));
        assert!(matches!(service.remove("1").await, Err(BlacklistError::NotReady)));
        assert!(matches!(service.load().await, Err(StorageError::NotLoaded)));
        assert_eq!(brain.save_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_entry_fails_open() {
        let (_brain, service) = loaded_service(&[]).await;
        assert!(service.is_loaded());
        assert!(service.entries().is_empty());
    }

    #[tokio::test]
    async fn test_add_deduplicates() {
        let (brain, mut service) = loaded_service(&[]).await;

        assert!(service.add("7").await.unwrap());
        assert!(!service.add("7").await.unwrap());

        assert_eq!(service.entries(), ["7".to_string()]);
        assert_eq!(brain.save_count(), 1);
        assert_eq!(brain.get(BLACKLIST_KEY).await.unwrap().as_deref(), Some(r#"["7"]"#));
    }

    #[tokio::test]
    async fn test_remove_absent_does_not_save() {
        let (brain, mut service) = loaded_service(&[]).await;
        service.add("1").await.unwrap();
        let saves = brain.save_count();

        let err = service.remove("2").await.unwrap_err();
        assert!(matches!(err, BlacklistError::NotFound(id) if id == "2"));
        assert_eq!(service.entries(), ["1".to_string()]);
        assert_eq!(brain.save_count(), saves);
    }

    #[tokio::test]
    async fn test_resolve_by_name_variants() {
        let (_brain, service) = loaded_service(&[("11", "Alice"), ("12", "Bob")]).await;

        let expected = Some(User::new("11", "Alice"));
        assert_eq!(service.resolve_by_name("@Alice").await, expected);
        assert_eq!(service.resolve_by_name("Alice").await, expected);
        assert_eq!(service.resolve_by_name("  Alice ").await, expected);
        assert_eq!(service.resolve_by_name("alice").await, expected);
        assert_eq!(service.resolve_by_name("Carol").await, None);
    }

    #[tokio::test]
    async fn test_resolve_skips_users_without_id() {
        let (_brain, service) = loaded_service(&[("", "Ghost"), ("5", "Eve")]).await;
        assert_eq!(service.resolve_by_name("Ghost").await, None);
        assert_eq!(service.resolve_by_id("5").await, Some(User::new("5", "Eve")));
        assert_eq!(service.resolve_by_id("6").await, None);
    }

    #[tokio::test]
    async fn test_load_collapses_stored_duplicates() {
        let brain = Arc::new(BrainStore::memory());
        brain.load().await.unwrap();
        brain.set(BLACKLIST_KEY, r#"["3","1","3"]"#).await.unwrap();

        let mut service = BlacklistService::new(brain.clone(), brain.clone());
        service.load().await.unwrap();
        assert_eq!(service.entries(), ["3".to_string(), "1".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_save_leaves_blacklist_unchanged() {
        let brain = Arc::new(BrainStore::memory());
        let store = Arc::new(FlakyStore {
            inner: BrainStore::memory(),
            broken: AtomicBool::new(false),
        });
        store.load().await.unwrap();
        let mut service = BlacklistService::new(store.clone(), brain);
        service.load().await.unwrap();

        service.add("1").await.unwrap();
        store.broken.store(true, Ordering::SeqCst);

        assert!(matches!(service.add("2").await, Err(BlacklistError::Storage(_))));
        assert!(!service.is_blacklisted("2"));
        assert_eq!(service.entries(), ["1".to_string()]);
        assert_eq!(store.get(BLACKLIST_KEY).await.unwrap().as_deref(), Some(r#"["1"]"#));

        assert!(matches!(service.remove("1").await, Err(BlacklistError::Storage(_))));
        assert!(service.is_blacklisted("1"));
        assert_eq!(store.get(BLACKLIST_KEY).await.unwrap().as_deref(), Some(r#"["1"]"#));

        // A later save must not flush the rejected change
        store.broken.store(false, Ordering::SeqCst);
        store.save().await.unwrap();
        assert_eq!(store.get(BLACKLIST_KEY).await.unwrap().as_deref(), Some(r#"["1"]"#));
    }

    #[tokio::test]
    async fn test_failed_first_save_clears_key() {
        let brain = Arc::new(BrainStore::memory());
        let store = Arc::new(FlakyStore {
            inner: BrainStore::memory(),
            broken: AtomicBool::new(true),
        });
        store.load().await.unwrap();
        let mut service = BlacklistService::new(store.clone(), brain);
        service.load().await.unwrap();

        assert!(service.add("9").await.is_err());
        assert!(service.entries().is_empty());
        assert_eq!(store.get(BLACKLIST_KEY).await.unwrap(), None);
    }
}
