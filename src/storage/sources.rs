use super::schema::Database;
use super::types::{FeedSource, FeedSourceRow, StoreError};
use crate::category::Category;

fn row_to_source(row: FeedSourceRow) -> Option<FeedSource> {
    let (id, name, url, category, is_active, last_fetched, fetch_error, created_at) = row;
    let category = match category.parse::<Category>() {
        Ok(c) => c,
        Err(e) => {
            // A row with an unknown tag can only appear through manual edits;
            // skip it rather than failing every registry read.
            tracing::warn!(id = id, error = %e, "Skipping feed source with unknown category");
            return None;
        }
    };
    Some(FeedSource {
        id,
        name,
        url,
        category,
        is_active,
        last_fetched,
        fetch_error,
        created_at,
    })
}

const SOURCE_COLUMNS: &str =
    "id, name, url, category, is_active, last_fetched, fetch_error, created_at";

impl Database {
    // ========================================================================
    // Feed Registry Operations
    // ========================================================================

    /// Register a feed, updating name/category if the URL already exists.
    /// Returns the source id.
    pub async fn add_source(
        &self,
        name: &str,
        url: &str,
        category: Category,
    ) -> Result<i64, StoreError> {
        let now = chrono::Utc::now().timestamp();
        let row: (i64,) = sqlx::query_as(
            r#"
            INSERT INTO feed_sources (name, url, category, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(url) DO UPDATE SET
                name = excluded.name,
                category = excluded.category
            RETURNING id
            "#,
        )
        .bind(name)
        .bind(url)
        .bind(category.as_str())
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0)
    }

    /// Active sources for a category, the set a registry-backed ingestion
    /// run polls.
    pub async fn active_sources(&self, category: Category) -> Result<Vec<FeedSource>, StoreError> {
        let rows: Vec<FeedSourceRow> = sqlx::query_as(&format!(
            "SELECT {SOURCE_COLUMNS} FROM feed_sources
             WHERE category = ? AND is_active = 1
             ORDER BY name"
        ))
        .bind(category.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().filter_map(row_to_source).collect())
    }

    /// All sources, optionally filtered by category.
    pub async fn list_sources(
        &self,
        category: Option<Category>,
    ) -> Result<Vec<FeedSource>, StoreError> {
        let rows: Vec<FeedSourceRow> = match category {
            Some(c) => {
                sqlx::query_as(&format!(
                    "SELECT {SOURCE_COLUMNS} FROM feed_sources
                     WHERE category = ? ORDER BY category, name"
                ))
                .bind(c.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as(&format!(
                    "SELECT {SOURCE_COLUMNS} FROM feed_sources ORDER BY category, name"
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows.into_iter().filter_map(row_to_source).collect())
    }

    /// Toggle a source's active flag.
    pub async fn set_source_active(&self, id: i64, active: bool) -> Result<(), StoreError> {
        sqlx::query("UPDATE feed_sources SET is_active = ? WHERE id = ?")
            .bind(active)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Record a successful fetch: stamp last_fetched, clear any error.
    pub async fn mark_source_fetched(&self, id: i64) -> Result<(), StoreError> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query("UPDATE feed_sources SET last_fetched = ?, fetch_error = NULL WHERE id = ?")
            .bind(now)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Record a failed fetch.
    pub async fn set_source_error(&self, id: i64, error: &str) -> Result<(), StoreError> {
        sqlx::query("UPDATE feed_sources SET fetch_error = ? WHERE id = ?")
            .bind(error)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::category::Category;
    use crate::storage::Database;

    async fn test_db() -> Database {
        Database::open(":memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_add_and_list_sources() {
        let db = test_db().await;

        db.add_source(
            "Radiology Business",
            "https://radiologybusiness.com/feed",
            Category::MedicalNews,
        )
        .await
        .unwrap();

        let sources = db.list_sources(None).await.unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].name, "Radiology Business");
        assert_eq!(sources[0].category, Category::MedicalNews);
        assert!(sources[0].is_active);
        assert!(sources[0].last_fetched.is_none());
    }

    #[tokio::test]
    async fn test_add_source_upserts_on_url() {
        let db = test_db().await;

        let id1 = db
            .add_source("Old Name", "https://x/feed", Category::MedicalNews)
            .await
            .unwrap();
        let id2 = db
            .add_source("New Name", "https://x/feed", Category::AiMedicalImaging)
            .await
            .unwrap();

        assert_eq!(id1, id2);
        let sources = db.list_sources(None).await.unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].name, "New Name");
        assert_eq!(sources[0].category, Category::AiMedicalImaging);
    }

    #[tokio::test]
    async fn test_active_sources_filters_category_and_flag() {
        let db = test_db().await;

        let id = db
            .add_source("A", "https://a/feed", Category::MedicalNews)
            .await
            .unwrap();
        db.add_source("B", "https://b/feed", Category::MedicalNews)
            .await
            .unwrap();
        db.add_source("C", "https://c/feed", Category::AiMedicalImaging)
            .await
            .unwrap();

        db.set_source_active(id, false).await.unwrap();

        let active = db.active_sources(Category::MedicalNews).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].name, "B");
    }

    #[tokio::test]
    async fn test_fetch_bookkeeping() {
        let db = test_db().await;

        let id = db
            .add_source("A", "https://a/feed", Category::MedicalNews)
            .await
            .unwrap();

        db.set_source_error(id, "HTTP error: status 404")
            .await
            .unwrap();
        let sources = db.list_sources(None).await.unwrap();
        assert_eq!(
            sources[0].fetch_error.as_deref(),
            Some("HTTP error: status 404")
        );

        db.mark_source_fetched(id).await.unwrap();
        let sources = db.list_sources(None).await.unwrap();
        assert!(sources[0].fetch_error.is_none());
        assert!(sources[0].last_fetched.is_some());
    }
}
