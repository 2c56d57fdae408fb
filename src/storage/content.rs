use super::schema::Database;
use super::types::{ContentRecord, InsertOutcome, NewContent, StoreError};
use crate::category::Category;

impl Database {
    // ========================================================================
    // Content Operations
    // ========================================================================
    //
    // Table names are interpolated from the closed Category enum, never from
    // user input.

    /// Dedup check: true when any stored row in the category's table matches
    /// the guid OR the link. A single read; no transaction spans this check
    /// and a later insert (see [`insert_content`](Self::insert_content) for
    /// the backstop).
    pub async fn content_exists(
        &self,
        category: Category,
        guid: &str,
        link: &str,
    ) -> Result<bool, StoreError> {
        let row: (bool,) = sqlx::query_as(&format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE guid = ? OR link = ?)",
            category.table()
        ))
        .bind(guid)
        .bind(link)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0)
    }

    /// Insert a content row.
    ///
    /// A unique-index violation on guid or link means a concurrent run won
    /// the race between check and insert; that is reported as
    /// [`InsertOutcome::Duplicate`], not an error.
    pub async fn insert_content(
        &self,
        category: Category,
        item: &NewContent,
    ) -> Result<InsertOutcome, StoreError> {
        let now = chrono::Utc::now().timestamp();
        let result = sqlx::query(&format!(
            r#"
            INSERT INTO {} (title, description, pub_date, link, source_name, guid, image, fetched_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            category.table()
        ))
        .bind(&item.title)
        .bind(&item.description)
        .bind(item.pub_date)
        .bind(&item.link)
        .bind(&item.source_name)
        .bind(&item.guid)
        .bind(&item.image)
        .bind(now)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(InsertOutcome::Inserted),
            Err(sqlx::Error::Database(db_err))
                if db_err.message().contains("UNIQUE constraint failed") =>
            {
                Ok(InsertOutcome::Duplicate)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Delete all rows in the category's table older than `cutoff`
    /// (epoch seconds). Returns the number of rows deleted; idempotent.
    pub async fn prune_content(
        &self,
        category: Category,
        cutoff: i64,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(&format!(
            "DELETE FROM {} WHERE pub_date < ?",
            category.table()
        ))
        .bind(cutoff)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Number of stored rows for a category.
    pub async fn count_content(&self, category: Category) -> Result<i64, StoreError> {
        let row: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", category.table()))
            .fetch_one(&self.pool)
            .await?;

        Ok(row.0)
    }

    /// Most recent rows for a category, newest first.
    pub async fn recent_content(
        &self,
        category: Category,
        limit: i64,
    ) -> Result<Vec<ContentRecord>, StoreError> {
        let rows = sqlx::query_as::<_, ContentRecord>(&format!(
            r#"
            SELECT id, title, description, pub_date, link, source_name, guid, image, fetched_at
            FROM {}
            ORDER BY pub_date DESC, fetched_at DESC
            LIMIT ?
            "#,
            category.table()
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
