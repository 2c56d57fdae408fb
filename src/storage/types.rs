use thiserror::Error;

use crate::category::Category;

// ============================================================================
// Error Types
// ============================================================================

/// Store-level errors. Per-entry store failures are caught at the
/// orchestrator boundary and never abort a feed or category run.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Migration failed
    #[error("database migration failed: {0}")]
    Migration(String),

    /// Generic database error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

// ============================================================================
// Data Structures
// ============================================================================

/// A normalized article ready for insertion.
///
/// `title` and `description` are plain text (tags stripped, entities
/// decoded); `pub_date` is epoch seconds and always present — entries whose
/// dates cannot be parsed are rejected upstream rather than stored with a
/// sentinel.
#[derive(Debug, Clone)]
pub struct NewContent {
    pub title: String,
    pub description: String,
    pub pub_date: i64,
    pub link: String,
    pub source_name: String,
    pub guid: String,
    pub image: Option<String>,
}

/// A stored article row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ContentRecord {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub pub_date: i64,
    pub link: String,
    pub source_name: String,
    pub guid: String,
    pub image: Option<String>,
    pub fetched_at: i64,
}

/// Outcome of a content insert.
///
/// A unique-index violation on guid or link is reported as `Duplicate`
/// rather than an error: it means a concurrent run persisted the same entry
/// between our existence check and the insert, which is benign.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    Duplicate,
}

/// A registry-managed feed: polled for its category when active.
///
/// Rows are created and edited by the admin surface; ingestion consumes them
/// read-only apart from `last_fetched` and `fetch_error`.
#[derive(Debug, Clone)]
pub struct FeedSource {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub category: Category,
    pub is_active: bool,
    pub last_fetched: Option<i64>,
    pub fetch_error: Option<String>,
    pub created_at: i64,
}

/// Internal row type for feed_sources queries.
pub(crate) type FeedSourceRow = (
    i64,
    String,
    String,
    String,
    bool,
    Option<i64>,
    Option<String>,
    i64,
);
