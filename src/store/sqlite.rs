use super::common::{normalize_address, normalize_phrase};
use super::{Blacklist, ModerationStore};
use crate::error::StoreError;
use async_trait::async_trait;
use sqlx::{
    Row, SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use std::str::FromStr;

// SQL schemas for SQLite storage
const BLACKLISTS_TABLE: &str = "CREATE TABLE IF NOT EXISTS blacklists (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        weight REAL NOT NULL DEFAULT 1.0
    )";

const PHRASES_TABLE: &str = "CREATE TABLE IF NOT EXISTS phrases (
        blacklist_id INTEGER NOT NULL REFERENCES blacklists(id) ON DELETE CASCADE,
        phrase TEXT NOT NULL,
        PRIMARY KEY(blacklist_id, phrase)
    )";

const BANNED_IPS_TABLE: &str = "CREATE TABLE IF NOT EXISTS banned_ips (
        address TEXT PRIMARY KEY,
        created_at INTEGER NOT NULL
    )";

const COMMENT_LOG_TABLE: &str = "CREATE TABLE IF NOT EXISTS comment_log (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        ip_address TEXT NOT NULL,
        is_public INTEGER NOT NULL,
        recorded_at INTEGER NOT NULL
    )";

const COMMENT_LOG_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS comment_log_ip ON comment_log(ip_address, is_public)";

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a new SQLite store.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    #[tracing::instrument(skip_all)]
    pub async fn new(path: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(path)?
            .create_if_missing(true)
            .foreign_keys(true);

        // Every connection to :memory: opens its own empty database
        let max_connections = if path.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        for statement in [
            BLACKLISTS_TABLE,
            PHRASES_TABLE,
            BANNED_IPS_TABLE,
            COMMENT_LOG_TABLE,
            COMMENT_LOG_INDEX,
        ] {
            sqlx::query(statement).execute(&pool).await?;
        }

        Ok(Self { pool })
    }

    async fn blacklist_id(&self, name: &str) -> Result<i64, StoreError> {
        sqlx::query_scalar("SELECT id FROM blacklists WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::BlacklistNotFound(name.to_string()))
    }
}

#[async_trait]
impl ModerationStore for SqliteStore {
    #[tracing::instrument(skip_all)]
    async fn add_blacklist(&self, name: &str, weight: f64) -> Result<i64, StoreError> {
        sqlx::query("INSERT OR IGNORE INTO blacklists (name, weight) VALUES (?, ?)")
            .bind(name)
            .bind(weight)
            .execute(&self.pool)
            .await?;
        self.blacklist_id(name).await
    }

    #[tracing::instrument(skip_all)]
    async fn remove_blacklist(&self, name: &str) -> Result<(), StoreError> {
        let id = self.blacklist_id(name).await?;
        sqlx::query("DELETE FROM phrases WHERE blacklist_id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        sqlx::query("DELETE FROM blacklists WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    #[tracing::instrument(skip_all)]
    async fn set_blacklist_weight(&self, name: &str, weight: f64) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE blacklists SET weight = ? WHERE name = ?")
            .bind(weight)
            .bind(name)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::BlacklistNotFound(name.to_string()));
        }
        Ok(())
    }

    #[tracing::instrument(skip_all)]
    async fn add_phrase(&self, blacklist: &str, phrase: &str) -> Result<(), StoreError> {
        let id = self.blacklist_id(blacklist).await?;
        sqlx::query("INSERT OR IGNORE INTO phrases (blacklist_id, phrase) VALUES (?, ?)")
            .bind(id)
            .bind(normalize_phrase(phrase))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    #[tracing::instrument(skip_all)]
    async fn remove_phrase(&self, blacklist: &str, phrase: &str) -> Result<(), StoreError> {
        let id = self.blacklist_id(blacklist).await?;
        sqlx::query("DELETE FROM phrases WHERE blacklist_id = ? AND phrase = ?")
            .bind(id)
            .bind(normalize_phrase(phrase))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    #[tracing::instrument(skip_all)]
    async fn list_blacklists(&self) -> Result<Vec<Blacklist>, StoreError> {
        let rows = sqlx::query("SELECT id, name, weight FROM blacklists ORDER BY name, weight DESC")
            .fetch_all(&self.pool)
            .await?;
        let mut lists = Vec::with_capacity(rows.len());
        for row in rows {
            lists.push(Blacklist {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
                weight: row.try_get("weight")?,
                phrases: Vec::new(),
            });
        }

        let phrases = sqlx::query("SELECT blacklist_id, phrase FROM phrases ORDER BY phrase")
            .fetch_all(&self.pool)
            .await?;
        for row in phrases {
            let id: i64 = row.try_get("blacklist_id")?;
            let phrase: String = row.try_get("phrase")?;
            if let Some(list) = lists.iter_mut().find(|l| l.id == id) {
                list.phrases.push(phrase);
            }
        }
        Ok(lists)
    }

    #[tracing::instrument(skip_all)]
    async fn ban_ip(&self, address: &str) -> Result<bool, StoreError> {
        let address = normalize_address(address)?;
        let result =
            sqlx::query("INSERT OR IGNORE INTO banned_ips (address, created_at) VALUES (?, ?)")
                .bind(&address)
                .bind(chrono::Utc::now().timestamp())
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip_all)]
    async fn unban_ip(&self, address: &str) -> Result<(), StoreError> {
        let address = normalize_address(address)?;
        sqlx::query("DELETE FROM banned_ips WHERE address = ?")
            .bind(address)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    #[tracing::instrument(skip_all)]
    async fn list_banned_ips(&self) -> Result<Vec<String>, StoreError> {
        let rows = sqlx::query_scalar("SELECT address FROM banned_ips ORDER BY address")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    #[tracing::instrument(skip_all)]
    async fn record_comment(&self, ip_address: &str, is_public: bool) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO comment_log (ip_address, is_public, recorded_at) VALUES (?, ?, ?)")
            .bind(ip_address.trim())
            .bind(i32::from(is_public))
            .bind(chrono::Utc::now().timestamp())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    #[tracing::instrument(skip_all)]
    async fn count_held(&self, ip_address: &str) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM comment_log WHERE ip_address = ? AND is_public = 0",
        )
        .bind(ip_address.trim())
        .fetch_one(&self.pool)
        .await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}
