// src/store/sqlite.rs

use super::SubscriptionStore;
use crate::{error::StoreError, types::DirectionRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use std::str::FromStr;
use tracing::info;

const SELECT_COLUMNS: &str = "direction, subscribers, created_at, updated_at";

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct DirectionRow {
    direction: String,
    subscribers: String,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<DirectionRow> for DirectionRecord {
    type Error = StoreError;

    fn try_from(row: DirectionRow) -> Result<Self, Self::Error> {
        let subscribers: Vec<String> =
            serde_json::from_str(&row.subscribers).map_err(|source| StoreError::Corrupt {
                direction: row.direction.clone(),
                source,
            })?;
        Ok(DirectionRecord {
            direction: row.direction,
            subscribers,
            created_at: from_millis(row.created_at),
            updated_at: from_millis(row.updated_at),
        })
    }
}

fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 建立连接池并初始化表结构。
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let in_memory = database_url.contains(":memory:");

        if !in_memory {
            let path = database_url
                .trim_start_matches("sqlite://")
                .trim_start_matches("sqlite:");
            if let Some(parent) = std::path::Path::new(path).parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    std::fs::create_dir_all(parent)?;
                }
            }
        }

        let db_opts = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .pragma("busy_timeout", "5000");

        // 内存库每个连接都是独立的数据库，只能用单连接且不回收
        let pool_opts = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(8)
        };

        let pool = pool_opts.connect_with(db_opts).await?;
        let store = Self::new(pool);
        store.init_schema().await?;
        Ok(store)
    }

    pub async fn init_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS direction_subscriptions (
                direction TEXT PRIMARY KEY NOT NULL,
                subscribers TEXT NOT NULL DEFAULT '[]',
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;
        info!("🗃️ 'direction_subscriptions' table is ready.");
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl SubscriptionStore for SqliteStore {
    async fn get(&self, direction: &str) -> Result<Option<DirectionRecord>, StoreError> {
        let row = sqlx::query_as::<_, DirectionRow>(&format!(
            "SELECT {} FROM direction_subscriptions WHERE direction = ?",
            SELECT_COLUMNS
        ))
        .bind(direction)
        .fetch_optional(&self.pool)
        .await?;
        row.map(DirectionRecord::try_from).transpose()
    }

    async fn find_by_subscriber(
        &self,
        subscriber_id: &str,
    ) -> Result<Vec<DirectionRecord>, StoreError> {
        let rows = sqlx::query_as::<_, DirectionRow>(&format!(
            "SELECT {} FROM direction_subscriptions
             WHERE EXISTS (
                SELECT 1 FROM json_each(direction_subscriptions.subscribers)
                WHERE json_each.value = ?
             )
             ORDER BY direction ASC",
            SELECT_COLUMNS
        ))
        .bind(subscriber_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(DirectionRecord::try_from).collect()
    }

    async fn put(&self, record: DirectionRecord) -> Result<DirectionRecord, StoreError> {
        let subscribers =
            serde_json::to_string(&record.subscribers).map_err(|source| StoreError::Corrupt {
                direction: record.direction.clone(),
                source,
            })?;

        // 单条 upsert 语句，要么整体生效要么不生效
        let row = sqlx::query_as::<_, DirectionRow>(&format!(
            "INSERT INTO direction_subscriptions (direction, subscribers, created_at, updated_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(direction) DO UPDATE SET
                subscribers = excluded.subscribers,
                updated_at = excluded.updated_at
             RETURNING {}",
            SELECT_COLUMNS
        ))
        .bind(&record.direction)
        .bind(subscribers)
        .bind(record.created_at.timestamp_millis())
        .bind(record.updated_at.timestamp_millis())
        .fetch_one(&self.pool)
        .await?;
        DirectionRecord::try_from(row)
    }
}
