// src/store/sqlite.rs
//! SQLite-backed [`ItemStore`].
//!
//! One table, `items`, keyed by the source-assigned id. A session is one
//! pooled connection held for the lifetime of the session and returned to the
//! pool on drop.

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow,
};
use sqlx::{Row, Sqlite};
use tracing::info;

use super::{ItemStore, StoreSession};
use crate::error::StoreError;
use crate::model::ScoredItem;

const SELECT_COLUMNS: &str = "id, source, title, body, published_at, importance_score, \
     recency_score, final_score, category, is_filtered, ingested_at";

pub struct SqliteItemStore {
    pool: SqlitePool,
}

impl SqliteItemStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if missing) the database at `url` and run migrations.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let in_memory = url.contains(":memory:");
        let mut options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        if !in_memory {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        // sqlx names each `:memory:` database and opens it with a shared cache,
        // so every pooled connection sees the same data. The database lives as
        // long as one connection does, hence the pinned minimum.
        let pool = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(5)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(5)
                .connect_with(options)
                .await?
        };

        let store = Self::new(pool);
        store.migrate().await?;
        info!(target: "store", url, "item store ready");
        Ok(store)
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS items (
                id TEXT PRIMARY KEY,
                source TEXT NOT NULL,
                title TEXT NOT NULL,
                body TEXT,
                published_at TEXT NOT NULL,
                importance_score REAL,
                recency_score REAL,
                final_score REAL,
                category TEXT,
                is_filtered INTEGER NOT NULL DEFAULT 0,
                ingested_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Migrate(e.to_string()))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_items_ranked ON items(is_filtered, final_score DESC, id)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Migrate(e.to_string()))?;

        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn row_to_item(row: &SqliteRow) -> Result<ScoredItem, StoreError> {
    Ok(ScoredItem {
        id: row.try_get("id")?,
        source: row.try_get("source")?,
        title: row.try_get("title")?,
        body: row.try_get("body")?,
        published_at: row.try_get("published_at")?,
        importance_score: row.try_get("importance_score")?,
        recency_score: row.try_get("recency_score")?,
        final_score: row.try_get("final_score")?,
        category: row.try_get("category")?,
        is_filtered: row.try_get("is_filtered")?,
        ingested_at: row.try_get("ingested_at")?,
    })
}

struct SqliteSession {
    conn: PoolConnection<Sqlite>,
}

#[async_trait]
impl StoreSession for SqliteSession {
    async fn upsert(&mut self, item: &ScoredItem) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO items (id, source, title, body, published_at, importance_score,
                               recency_score, final_score, category, is_filtered, ingested_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                source = excluded.source,
                title = excluded.title,
                body = excluded.body,
                published_at = excluded.published_at,
                importance_score = excluded.importance_score,
                recency_score = excluded.recency_score,
                final_score = excluded.final_score,
                category = excluded.category,
                is_filtered = excluded.is_filtered,
                ingested_at = excluded.ingested_at
            "#,
        )
        .bind(&item.id)
        .bind(&item.source)
        .bind(&item.title)
        .bind(&item.body)
        .bind(item.published_at)
        .bind(item.importance_score)
        .bind(item.recency_score)
        .bind(item.final_score)
        .bind(&item.category)
        .bind(item.is_filtered)
        .bind(item.ingested_at)
        .execute(&mut *self.conn)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl ItemStore for SqliteItemStore {
    async fn session(&self) -> Result<Box<dyn StoreSession>, StoreError> {
        let conn = self.pool.acquire().await?;
        Ok(Box::new(SqliteSession { conn }))
    }

    async fn query_filtered_sorted(&self) -> Result<Vec<ScoredItem>, StoreError> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM items WHERE is_filtered = 1 \
             ORDER BY final_score IS NULL, final_score DESC, id ASC"
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(row_to_item).collect()
    }

    async fn get(&self, id: &str) -> Result<Option<ScoredItem>, StoreError> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM items WHERE id = ?");
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        row.as_ref().map(row_to_item).transpose()
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM items")
            .fetch_one(&self.pool)
            .await?;
        Ok(n.max(0) as u64)
    }
}
