use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};
use tokio::sync::RwLock;
use tracing::debug;

/// String-keyed durable slots, the client-side equivalent of browser local
/// storage.
#[async_trait]
pub trait SlotStore: Send + Sync {
    /// Overwrites the slot.
    async fn put_slot(&self, key: &str, value: &str) -> Result<()>;
    async fn get_slot(&self, key: &str) -> Result<Option<String>>;
    /// Returns whether a slot was present.
    async fn remove_slot(&self, key: &str) -> Result<bool>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSlot {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("invalid sqlite url '{database_url}'"))?
            .create_if_missing(true);
        // Every connection to `sqlite::memory:` opens a separate database.
        let max_connections = if is_memory_url(database_url) { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    pub async fn slot_record(&self, key: &str) -> Result<Option<StoredSlot>> {
        let row = sqlx::query(
            "SELECT slot_key, slot_value, updated_at FROM kv_slots WHERE slot_key = ?",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("failed to read slot '{key}'"))?;

        row.map(|r| -> Result<StoredSlot> {
            Ok(StoredSlot {
                key: r.try_get("slot_key")?,
                value: r.try_get("slot_value")?,
                updated_at: r.try_get("updated_at")?,
            })
        })
        .transpose()
    }

    pub async fn slot_keys(&self) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT slot_key FROM kv_slots ORDER BY slot_key")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|r| r.get::<String, _>(0)).collect())
    }
}

#[async_trait]
impl SlotStore for Storage {
    async fn put_slot(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO kv_slots (slot_key, slot_value, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(slot_key) DO UPDATE SET slot_value = excluded.slot_value, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to write slot '{key}'"))?;
        debug!(key, bytes = value.len(), "slot written");
        Ok(())
    }

    async fn get_slot(&self, key: &str) -> Result<Option<String>> {
        Ok(self.slot_record(key).await?.map(|slot| slot.value))
    }

    async fn remove_slot(&self, key: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM kv_slots WHERE slot_key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to remove slot '{key}'"))?;
        Ok(result.rows_affected() > 0)
    }
}

/// Process-local slots for tests and sessions that opt out of persistence.
#[derive(Default)]
pub struct MemorySlotStore {
    slots: RwLock<HashMap<String, String>>,
}

impl MemorySlotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.slots.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.slots.read().await.is_empty()
    }
}

#[async_trait]
impl SlotStore for MemorySlotStore {
    async fn put_slot(&self, key: &str, value: &str) -> Result<()> {
        self.slots
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get_slot(&self, key: &str) -> Result<Option<String>> {
        Ok(self.slots.read().await.get(key).cloned())
    }

    async fn remove_slot(&self, key: &str) -> Result<bool> {
        Ok(self.slots.write().await.remove(key).is_some())
    }
}

fn is_memory_url(database_url: &str) -> bool {
    database_url.starts_with("sqlite::memory:") || database_url.contains("mode=memory")
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if is_memory_url(database_url) || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
