//! Ingestion orchestration.
//!
//! One run covers one category: each of the category's feeds is fetched and
//! processed strictly sequentially, and entries within a feed are processed
//! in document order until the per-feed cap of new items is reached.
//! Failures are isolated at two levels: a failing entry skips only that
//! entry, and a failing feed skips only that feed.

mod images;

pub use images::{ImageResolver, ProbeError};

use futures::stream::{self, StreamExt};
use thiserror::Error;

use crate::category::Category;
use crate::config::Config;
use crate::feed::{fetch_feed, FetchError, ParsedEntry};
use crate::storage::{Database, InsertOutcome, NewContent, StoreError};
use crate::util::clean_html;

/// Source name recorded when a feed has no channel title.
const DEFAULT_SOURCE_NAME: &str = "Technology";

/// Concurrent category runs in `run_all`. Feeds within a category stay
/// sequential regardless — the per-feed cap depends on it.
const CATEGORY_CONCURRENCY: usize = 4;

/// Per-entry failures. Caught at the feed loop; the entry is skipped and
/// processing continues.
#[derive(Debug, Error)]
pub enum EntryError {
    #[error("entry has no parseable publication date")]
    MissingDate,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Outcome of one category run.
#[derive(Debug)]
pub struct CategorySummary {
    pub category: Category,
    pub feeds_ok: usize,
    pub feeds_failed: usize,
    pub inserted: usize,
}

/// Outcome of a retention pruning pass.
#[derive(Debug)]
pub struct PruneSummary {
    pub per_category: Vec<(Category, u64)>,
    pub total: u64,
}

pub struct Ingestor {
    db: Database,
    client: reqwest::Client,
    config: Config,
}

impl Ingestor {
    pub fn new(db: Database, client: reqwest::Client, config: Config) -> Self {
        Self { db, client, config }
    }

    /// Run ingestion for one category.
    ///
    /// Only registry reads can fail the run; fetch and entry failures are
    /// contained. For registry-backed categories the run records
    /// `last_fetched` / `fetch_error` on each source.
    pub async fn run_category(&self, category: Category) -> Result<CategorySummary, StoreError> {
        let feeds: Vec<(String, Option<i64>)> = if category.is_registry_backed() {
            self.db
                .active_sources(category)
                .await?
                .into_iter()
                .map(|source| (source.url, Some(source.id)))
                .collect()
        } else {
            category
                .builtin_feeds()
                .iter()
                .map(|url| (url.to_string(), None))
                .collect()
        };

        let mut summary = CategorySummary {
            category,
            feeds_ok: 0,
            feeds_failed: 0,
            inserted: 0,
        };

        for (url, source_id) in feeds {
            match self.ingest_feed(category, &url).await {
                Ok(inserted) => {
                    summary.feeds_ok += 1;
                    summary.inserted += inserted;
                    if let Some(id) = source_id {
                        if let Err(e) = self.db.mark_source_fetched(id).await {
                            tracing::warn!(source_id = id, error = %e, "Failed to record fetch time");
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        category = %category,
                        feed = %url,
                        error = %e,
                        "Feed fetch failed, skipping"
                    );
                    summary.feeds_failed += 1;
                    if let Some(id) = source_id {
                        if let Err(db_err) = self.db.set_source_error(id, &e.to_string()).await {
                            tracing::warn!(source_id = id, error = %db_err, "Failed to record fetch error");
                        }
                    }
                }
            }
        }

        tracing::info!(
            category = %category,
            feeds_ok = summary.feeds_ok,
            feeds_failed = summary.feeds_failed,
            inserted = summary.inserted,
            "Category run complete"
        );
        Ok(summary)
    }

    /// Run all categories, a few at a time. Each category remains an
    /// independent unit of work.
    pub async fn run_all(&self) -> Vec<Result<CategorySummary, StoreError>> {
        stream::iter(Category::ALL)
            .map(|category| self.run_category(category))
            .buffer_unordered(CATEGORY_CONCURRENCY)
            .collect()
            .await
    }

    /// Fetch one feed and persist up to `max_new_items_per_feed` new entries.
    /// Returns the number of items inserted.
    ///
    /// Already-stored entries do not count against the cap; a feed whose
    /// first entries are all known still gets fresh items from further down
    /// the document.
    pub async fn ingest_feed(&self, category: Category, url: &str) -> Result<usize, FetchError> {
        let parsed = fetch_feed(&self.client, url, &self.config).await?;
        let source_name = parsed
            .channel_title
            .map(|title| clean_html(&title))
            .filter(|title| !title.is_empty())
            .unwrap_or_else(|| DEFAULT_SOURCE_NAME.to_string());

        let mut inserted = 0usize;
        for entry in &parsed.entries {
            if inserted >= self.config.max_new_items_per_feed {
                break;
            }
            match self.process_entry(category, &source_name, entry).await {
                Ok(true) => inserted += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(
                        category = %category,
                        feed = %url,
                        guid = %entry.guid,
                        error = %e,
                        "Skipping entry"
                    );
                }
            }
        }

        Ok(inserted)
    }

    /// Process one entry: dedup check, then normalize and persist.
    /// Returns true when a new row was inserted, false for duplicates.
    async fn process_entry(
        &self,
        category: Category,
        source_name: &str,
        entry: &ParsedEntry,
    ) -> Result<bool, EntryError> {
        let link = entry.link.clone().unwrap_or_default();

        if self
            .db
            .content_exists(category, &entry.guid, &link)
            .await
            .map_err(EntryError::Store)?
        {
            return Ok(false);
        }

        let pub_date = entry.published.ok_or(EntryError::MissingDate)?;

        // The dominant cost: probes candidate URLs over the network.
        let image = ImageResolver::new(&self.client, &self.config)
            .resolve(entry)
            .await;

        let item = NewContent {
            title: clean_html(entry.title.as_deref().unwrap_or_default()),
            description: clean_html(entry.summary.as_deref().unwrap_or_default()),
            pub_date: pub_date.timestamp(),
            link,
            source_name: source_name.to_string(),
            guid: entry.guid.clone(),
            image,
        };

        match self
            .db
            .insert_content(category, &item)
            .await
            .map_err(EntryError::Store)?
        {
            InsertOutcome::Inserted => Ok(true),
            InsertOutcome::Duplicate => {
                tracing::debug!(
                    category = %category,
                    guid = %item.guid,
                    "Lost insert race to a concurrent run, treating as duplicate"
                );
                Ok(false)
            }
        }
    }

    /// Delete content older than the retention window, per category.
    /// Idempotent: a rerun with nothing eligible deletes zero rows.
    pub async fn prune_all(&self, retention_days: i64) -> Result<PruneSummary, StoreError> {
        let cutoff = (chrono::Utc::now() - chrono::Duration::days(retention_days)).timestamp();

        let mut per_category = Vec::with_capacity(Category::ALL.len());
        let mut total = 0u64;
        for category in Category::ALL {
            let deleted = self.db.prune_content(category, cutoff).await?;
            if deleted > 0 {
                tracing::info!(category = %category, deleted = deleted, "Pruned expired content");
            }
            total += deleted;
            per_category.push((category, deleted));
        }

        Ok(PruneSummary {
            per_category,
            total,
        })
    }
}
