use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use super::types::StoreError;
use crate::category::Category;

// ============================================================================
// Database
// ============================================================================

#[derive(Clone)]
pub struct Database {
    pub(crate) pool: SqlitePool,
}

impl Database {
    /// Open a database connection and run migrations.
    pub async fn open(path: &str) -> Result<Self, StoreError> {
        let url = format!("sqlite:{}?mode=rwc", path);

        // busy_timeout=5000: SQLite waits up to 5 seconds for locks to release
        // before returning SQLITE_BUSY. Set via pragma so every pooled
        // connection inherits it.
        let options = SqliteConnectOptions::from_str(&url)
            .map_err(StoreError::Database)?
            .pragma("busy_timeout", "5000");
        // SQLite is single-writer; ingestion is sequential per category, so a
        // small pool covers concurrent category runs.
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(StoreError::Database)?;
        let db = Self { pool };
        db.migrate()
            .await
            .map_err(|e| StoreError::Migration(e.to_string()))?;
        Ok(db)
    }

    /// Run schema migrations atomically within a transaction.
    ///
    /// All statements use `IF NOT EXISTS`, so re-running on an existing
    /// database is a no-op. One content table is created per category;
    /// the table list is fixed by [`Category::ALL`].
    async fn migrate(&self) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        // Feed registry for the database-driven categories.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS feed_sources (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                url TEXT UNIQUE NOT NULL,
                category TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1,
                last_fetched INTEGER,
                fetch_error TEXT,
                created_at INTEGER NOT NULL
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_feed_sources_category
             ON feed_sources(category, is_active)",
        )
        .execute(&mut *tx)
        .await?;

        for category in Category::ALL {
            let table = category.table();

            sqlx::query(&format!(
                r#"
                CREATE TABLE IF NOT EXISTS {table} (
                    id INTEGER PRIMARY KEY,
                    title TEXT NOT NULL,
                    description TEXT NOT NULL,
                    pub_date INTEGER NOT NULL,
                    link TEXT NOT NULL,
                    source_name TEXT NOT NULL,
                    guid TEXT NOT NULL,
                    image TEXT,
                    fetched_at INTEGER NOT NULL
                )
            "#
            ))
            .execute(&mut *tx)
            .await?;

            sqlx::query(&format!(
                "CREATE INDEX IF NOT EXISTS idx_{table}_pub_date
                 ON {table}(pub_date DESC)"
            ))
            .execute(&mut *tx)
            .await?;

            // Backstop for the unprotected check-then-insert sequence: a
            // concurrent run inserting the same entry trips one of these and
            // is reported as a benign duplicate. Empty keys are exempt.
            sqlx::query(&format!(
                "CREATE UNIQUE INDEX IF NOT EXISTS idx_{table}_guid
                 ON {table}(guid) WHERE guid <> ''"
            ))
            .execute(&mut *tx)
            .await?;

            sqlx::query(&format!(
                "CREATE UNIQUE INDEX IF NOT EXISTS idx_{table}_link
                 ON {table}(link) WHERE link <> ''"
            ))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(())
    }
}
