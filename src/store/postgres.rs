use super::common::{normalize_address, normalize_phrase};
use super::{Blacklist, ModerationStore};
use crate::error::StoreError;
use async_trait::async_trait;
use sqlx::{
    PgPool, Row,
    postgres::{PgConnectOptions, PgPoolOptions},
};
use std::str::FromStr;

// SQL schemas for PostgreSQL storage
const BLACKLISTS_TABLE: &str = "CREATE TABLE IF NOT EXISTS blacklists (
        id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL UNIQUE,
        weight DOUBLE PRECISION NOT NULL DEFAULT 1.0
    )";

const PHRASES_TABLE: &str = "CREATE TABLE IF NOT EXISTS phrases (
        blacklist_id BIGINT NOT NULL REFERENCES blacklists(id) ON DELETE CASCADE,
        phrase TEXT NOT NULL,
        PRIMARY KEY(blacklist_id, phrase)
    )";

const BANNED_IPS_TABLE: &str = "CREATE TABLE IF NOT EXISTS banned_ips (
        address TEXT PRIMARY KEY,
        created_at BIGINT NOT NULL
    )";

const COMMENT_LOG_TABLE: &str = "CREATE TABLE IF NOT EXISTS comment_log (
        id BIGSERIAL PRIMARY KEY,
        ip_address TEXT NOT NULL,
        is_public BOOLEAN NOT NULL,
        recorded_at BIGINT NOT NULL
    )";

const COMMENT_LOG_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS comment_log_ip ON comment_log(ip_address, is_public)";

#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new Postgres store backend.
    #[tracing::instrument(skip_all)]
    pub async fn new(uri: &str) -> Result<Self, StoreError> {
        let opts = PgConnectOptions::from_str(uri)?;
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
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
        sqlx::query_scalar("SELECT id FROM blacklists WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::BlacklistNotFound(name.to_string()))
    }
}

#[async_trait]
impl ModerationStore for PostgresStore {
    #[tracing::instrument(skip_all)]
    async fn add_blacklist(&self, name: &str, weight: f64) -> Result<i64, StoreError> {
        sqlx::query("INSERT INTO blacklists (name, weight) VALUES ($1, $2) ON CONFLICT (name) DO NOTHING")
            .bind(name)
            .bind(weight)
            .execute(&self.pool)
            .await?;
        self.blacklist_id(name).await
    }

    #[tracing::instrument(skip_all)]
    async fn remove_blacklist(&self, name: &str) -> Result<(), StoreError> {
        let id = self.blacklist_id(name).await?;
        sqlx::query("DELETE FROM phrases WHERE blacklist_id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        sqlx::query("DELETE FROM blacklists WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    #[tracing::instrument(skip_all)]
    async fn set_blacklist_weight(&self, name: &str, weight: f64) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE blacklists SET weight = $1 WHERE name = $2")
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
        sqlx::query(
            "INSERT INTO phrases (blacklist_id, phrase) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(id)
        .bind(normalize_phrase(phrase))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[tracing::instrument(skip_all)]
    async fn remove_phrase(&self, blacklist: &str, phrase: &str) -> Result<(), StoreError> {
        let id = self.blacklist_id(blacklist).await?;
        sqlx::query("DELETE FROM phrases WHERE blacklist_id = $1 AND phrase = $2")
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
        let result = sqlx::query(
            "INSERT INTO banned_ips (address, created_at) VALUES ($1, $2) ON CONFLICT (address) DO NOTHING",
        )
        .bind(&address)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip_all)]
    async fn unban_ip(&self, address: &str) -> Result<(), StoreError> {
        let address = normalize_address(address)?;
        sqlx::query("DELETE FROM banned_ips WHERE address = $1")
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
        sqlx::query(
            "INSERT INTO comment_log (ip_address, is_public, recorded_at) VALUES ($1, $2, $3)",
        )
        .bind(ip_address.trim())
        .bind(is_public)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[tracing::instrument(skip_all)]
    async fn count_held(&self, ip_address: &str) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM comment_log WHERE ip_address = $1 AND NOT is_public",
        )
        .bind(ip_address.trim())
        .fetch_one(&self.pool)
        .await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}
