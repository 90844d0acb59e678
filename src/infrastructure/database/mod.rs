use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;

use crate::application::errors::StorageError;
use crate::domain::entities::User;
use crate::infrastructure::storage::BrainData;

/// Sqlite persistence for the brain
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        let db = Self { conn: Mutex::new(conn) };
        db.init_tables()?;
        Ok(db)
    }

    fn init_tables(&self) -> Result<(), StorageError> {
        let conn = self.conn.lock().map_err(|_| StorageError::Poisoned)?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT UNIQUE NOT NULL,
                name TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;

        Ok(())
    }

    pub fn load_brain(&self) -> Result<BrainData, StorageError> {
        let conn = self.conn.lock().map_err(|_| StorageError::Poisoned)?;
        let mut brain = BrainData::default();

        let mut stmt = conn.prepare("SELECT user_id, name FROM users ORDER BY seq")?;
        let rows = stmt.query_map([], |row| Ok(User::new(row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;
        for user in rows {
            brain.users.push(user?);
        }

        let mut stmt = conn.prepare("SELECT key, value FROM kv")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;
        for row in rows {
            let (key, value) = row?;
            brain.data.insert(key, serde_json::from_str(&value)?);
        }

        Ok(brain)
    }

    /// Replace the stored key/value data and upsert users, in one transaction
    pub fn save_brain(&self, brain: &BrainData) -> Result<(), StorageError> {
        let mut conn = self.conn.lock().map_err(|_| StorageError::Poisoned)?;
        let tx = conn.transaction()?;

        for user in &brain.users {
            tx.execute(
                "INSERT INTO users (user_id, name) VALUES (?1, ?2)
                 ON CONFLICT(user_id) DO UPDATE SET name = excluded.name",
                params![user.id, user.name],
            )?;
        }

        tx.execute("DELETE FROM kv", [])?;
        for (key, value) in &brain.data {
            tx.execute(
                "INSERT INTO kv (key, value) VALUES (?1, ?2)",
                params![key, serde_json::to_string(value)?],
            )?;
        }

        tx.commit()?;
        Ok(())
    }
}
