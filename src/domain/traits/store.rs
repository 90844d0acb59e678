use async_trait::async_trait;
use crate::application::errors::StorageError;
use crate::domain::entities::User;

/// Store trait - key/value persistence with an explicit load step
///
/// Values are JSON-encoded strings. `set` only touches the working copy;
/// `save` makes it durable.
#[async_trait]
pub trait Store: Send + Sync {
    /// Read persisted state into memory. Must complete before `get` is meaningful.
    async fn load(&self) -> Result<(), StorageError>;

    fn is_loaded(&self) -> bool;

    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Flush the working copy to durable storage
    async fn save(&self) -> Result<(), StorageError>;
}

/// User directory - display name and id lookup over all known users
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn user_for_id(&self, id: &str) -> Option<User>;

    /// Case-insensitive exact match on the display name
    async fn user_for_name(&self, name: &str) -> Option<User>;

    /// All known users in directory order (first seen first)
    async fn users(&self) -> Vec<User>;

    /// Record a user, updating the display name of a known id.
    /// Returns true when the directory changed.
    async fn remember(&self, user: User) -> bool;
}
