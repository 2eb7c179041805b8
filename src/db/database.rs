use anyhow::Result;
use chrono::Utc;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::db::models::KvRow;
use crate::db::KeyValueStore;

/// SQLite-backed key-value slots. Every write replaces the stored value; the
/// last writer wins.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn init(database_url: &str) -> Result<Self> {
        // Each in-memory connection would otherwise open its own empty database.
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS kv_store (\
                key TEXT PRIMARY KEY NOT NULL,\
                value TEXT NOT NULL,\
                updated_at TEXT NOT NULL\
            );",
        )
        .execute(&pool)
        .await?;

        info!("Database tables created successfully");

        Ok(Database { pool })
    }

    pub async fn get_row(&self, key: &str) -> Result<Option<KvRow>> {
        let row = sqlx::query_as::<_, KvRow>(
            "SELECT key, value, updated_at FROM kv_store WHERE key = ?",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn upsert(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO kv_store (key, value, updated_at) VALUES (?, ?, ?) \
             ON CONFLICT(key) DO UPDATE SET \
             value = excluded.value, \
             updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        debug!("Stored {} bytes under key {}", value.len(), key);
        Ok(())
    }

    pub async fn delete(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM kv_store WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

impl KeyValueStore for Database {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.get_row(key).await?.map(|row| row.value))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.upsert(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.delete(key).await
    }
}
