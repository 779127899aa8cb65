use crate::error::{AppError, Result};
use crate::models::EquityRecord;
use chrono::{TimeZone, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// SQLite-backed store of equity records and their like sets.
///
/// Cloning is cheap (the pool is shared), which is what lets price updates
/// run on a detached task while the request keeps its own handle.
#[derive(Debug, Clone)]
pub struct EquityStore {
    pool: SqlitePool,
}

impl EquityStore {
    pub async fn open(database_path: &Path) -> Result<Self> {
        info!("Opening equity store at {:?}", database_path);

        if let Some(parent) = database_path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                AppError::Store(format!("failed to create database directory: {e}"))
            })?;
        }

        let connect_options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal) // Concurrent readers and writers
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(30))
            .foreign_keys(true);

        let pool = SqlitePool::connect_with(connect_options).await?;

        let store = Self { pool };
        store.initialize_schema().await?;
        Ok(store)
    }

    async fn initialize_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS equities (
                symbol TEXT PRIMARY KEY,
                price TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // The composite primary key is what makes likes a set: re-inserting
        // an existing (symbol, identity) pair is a no-op.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS equity_likes (
                symbol TEXT NOT NULL,
                identity TEXT NOT NULL,
                PRIMARY KEY (symbol, identity)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Exact-key lookup. `likes` is the current like-set size.
    pub async fn get(&self, symbol: &str) -> Result<Option<EquityRecord>> {
        let row = sqlx::query(
            r#"
            SELECT e.symbol, e.price, e.updated_at,
                   (SELECT COUNT(*) FROM equity_likes l WHERE l.symbol = e.symbol) AS likes
            FROM equities e
            WHERE e.symbol = ?
            "#,
        )
        .bind(symbol)
        .fetch_optional(&self.pool)
        .await?;

        row.map(record_from_row).transpose()
    }

    /// Insert a record for `symbol` unless one already exists. Concurrent
    /// creates collapse onto the same row via the primary-key conflict
    /// clause; the read-back returns whichever insert won.
    pub async fn create(
        &self,
        symbol: &str,
        price: &str,
        initial_liker: Option<&str>,
    ) -> Result<EquityRecord> {
        sqlx::query(
            "INSERT INTO equities (symbol, price, updated_at) VALUES (?, ?, ?) \
             ON CONFLICT(symbol) DO NOTHING",
        )
        .bind(symbol)
        .bind(price)
        .bind(Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;

        if let Some(identity) = initial_liker {
            self.add_like(symbol, identity).await?;
        }

        self.get(symbol)
            .await?
            .ok_or_else(|| AppError::Store(format!("equity {symbol} missing after insert")))
    }

    /// `price` and `updated_at` always move together.
    pub async fn update_price(&self, symbol: &str, price: &str) -> Result<()> {
        sqlx::query("UPDATE equities SET price = ?, updated_at = ? WHERE symbol = ?")
            .bind(price)
            .bind(Utc::now().timestamp_millis())
            .bind(symbol)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Returns true when the identity was newly added to the like set.
    pub async fn add_like(&self, symbol: &str, identity: &str) -> Result<bool> {
        let result =
            sqlx::query("INSERT OR IGNORE INTO equity_likes (symbol, identity) VALUES (?, ?)")
                .bind(symbol)
                .bind(identity)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn likes(&self, symbol: &str) -> Result<u64> {
        let row = sqlx::query("SELECT COUNT(*) AS likes FROM equity_likes WHERE symbol = ?")
            .bind(symbol)
            .fetch_one(&self.pool)
            .await?;
        let likes: i64 = row.get("likes");
        Ok(likes as u64)
    }

    pub async fn equity_count(&self) -> Result<u64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM equities")
            .fetch_one(&self.pool)
            .await?;
        let n: i64 = row.get("n");
        Ok(n as u64)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn record_from_row(row: SqliteRow) -> Result<EquityRecord> {
    let millis: i64 = row.get("updated_at");
    let updated_at = Utc
        .timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| AppError::Store(format!("invalid updated_at timestamp: {millis}")))?;
    let likes: i64 = row.get("likes");

    Ok(EquityRecord {
        symbol: row.get("symbol"),
        price: row.get("price"),
        updated_at,
        likes: likes as u64,
    })
}
