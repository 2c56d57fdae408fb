//! End-to-end ingestion tests: feed documents served over HTTP, processed
//! into an in-memory SQLite store.

use newsdesk::category::Category;
use newsdesk::config::Config;
use newsdesk::ingest::Ingestor;
use newsdesk::storage::{Database, NewContent};
use pretty_assertions::assert_eq;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn test_db() -> Database {
    Database::open(":memory:").await.unwrap()
}

fn test_ingestor(db: &Database) -> Ingestor {
    Ingestor::new(db.clone(), reqwest::Client::new(), Config::default())
}

/// Minimal GIF header carrying the given logical screen dimensions.
fn gif_bytes(width: u16, height: u16) -> Vec<u8> {
    let mut bytes = b"GIF89a".to_vec();
    bytes.extend_from_slice(&width.to_le_bytes());
    bytes.extend_from_slice(&height.to_le_bytes());
    bytes.extend_from_slice(&[0x00, 0x00, 0x00, 0x3B]);
    bytes
}

async fn mount_image(server: &MockServer, route: &str, width: u16) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(gif_bytes(width, 300), "image/gif"))
        .mount(server)
        .await;
}

async fn mount_feed(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("Content-Type", "application/rss+xml"),
        )
        .mount(server)
        .await;
}

fn rss_feed(channel_title: Option<&str>, items: &[String]) -> String {
    let title = channel_title
        .map(|t| format!("<title>{}</title>", t))
        .unwrap_or_default();
    format!(
        r#"<?xml version="1.0"?>
<rss version="2.0" xmlns:media="http://search.yahoo.com/mrss/">
<channel>{}{}</channel>
</rss>"#,
        title,
        items.concat()
    )
}

/// An item with a valid date and a wide declared image.
fn rss_item(n: usize, image_url: &str) -> String {
    format!(
        r#"<item>
  <guid>item-{n}</guid>
  <title>Story {n}</title>
  <link>https://example.com/story/{n}</link>
  <pubDate>Fri, 01 Mar 2024 10:{n:02}:00 +0000</pubDate>
  <description>&lt;b&gt;Body&lt;/b&gt; of story {n}</description>
  <media:content url="{image_url}" type="image/gif" width="640"/>
</item>"#
    )
}

/// An item with a valid date and no image candidates at all, for tests that
/// are not about image resolution.
fn rss_item_plain(n: usize) -> String {
    format!(
        r#"<item>
  <guid>item-{n}</guid>
  <title>Story {n}</title>
  <link>https://example.com/story/{n}</link>
  <pubDate>Fri, 01 Mar 2024 10:{n:02}:00 +0000</pubDate>
  <description>&lt;b&gt;Body&lt;/b&gt; of story {n}</description>
</item>"#
    )
}

fn stored_item(guid: &str, link: &str) -> NewContent {
    NewContent {
        title: format!("Stored {}", guid),
        description: "existing".to_string(),
        pub_date: 1709287200,
        link: link.to_string(),
        source_name: "Tech Wire".to_string(),
        guid: guid.to_string(),
        image: None,
    }
}

// ============================================================================
// Per-feed cap
// ============================================================================

#[tokio::test]
async fn test_five_new_entries_persist_first_three_in_order() {
    let server = MockServer::start().await;
    mount_image(&server, "/img.gif", 640).await;
    let image = format!("{}/img.gif", server.uri());
    let items: Vec<String> = (1..=5).map(|n| rss_item(n, &image)).collect();
    mount_feed(&server, "/feed", rss_feed(Some("Tech Wire"), &items)).await;

    let db = test_db().await;
    let ingestor = test_ingestor(&db);
    let inserted = ingestor
        .ingest_feed(Category::General, &format!("{}/feed", server.uri()))
        .await
        .unwrap();

    assert_eq!(inserted, 3);
    assert_eq!(db.count_content(Category::General).await.unwrap(), 3);
    for n in 1..=3 {
        assert!(
            db.content_exists(Category::General, &format!("item-{}", n), "")
                .await
                .unwrap(),
            "item-{} should be stored",
            n
        );
    }
    assert!(!db
        .content_exists(Category::General, "item-4", "")
        .await
        .unwrap());

    let records = db.recent_content(Category::General, 10).await.unwrap();
    let first = records.iter().find(|r| r.guid == "item-1").unwrap();
    assert_eq!(first.title, "Story 1");
    assert_eq!(first.description, "Body of story 1");
    assert_eq!(first.source_name, "Tech Wire");
    assert_eq!(first.link, "https://example.com/story/1");
    assert_eq!(first.image.as_deref(), Some(image.as_str()));
}

#[tokio::test]
async fn test_rerun_of_same_document_inserts_nothing_new() {
    let server = MockServer::start().await;
    mount_image(&server, "/img.gif", 640).await;
    let image = format!("{}/img.gif", server.uri());
    let items: Vec<String> = (1..=3).map(|n| rss_item(n, &image)).collect();
    mount_feed(&server, "/feed", rss_feed(Some("Tech Wire"), &items)).await;

    let db = test_db().await;
    let ingestor = test_ingestor(&db);
    let url = format!("{}/feed", server.uri());

    let first = ingestor.ingest_feed(Category::Crypto, &url).await.unwrap();
    let second = ingestor.ingest_feed(Category::Crypto, &url).await.unwrap();

    assert_eq!(first, 3);
    assert_eq!(second, 0);
    assert_eq!(db.count_content(Category::Crypto).await.unwrap(), 3);
}

#[tokio::test]
async fn test_already_seen_entries_do_not_count_against_cap() {
    let server = MockServer::start().await;
    mount_image(&server, "/img.gif", 640).await;
    let image = format!("{}/img.gif", server.uri());
    let items: Vec<String> = (1..=5).map(|n| rss_item(n, &image)).collect();
    mount_feed(&server, "/feed", rss_feed(Some("Tech Wire"), &items)).await;

    let db = test_db().await;
    // Items 1 and 2 are already stored from a previous cycle.
    db.insert_content(
        Category::Ai,
        &stored_item("item-1", "https://example.com/story/1"),
    )
    .await
    .unwrap();
    db.insert_content(
        Category::Ai,
        &stored_item("item-2", "https://example.com/story/2"),
    )
    .await
    .unwrap();

    let ingestor = test_ingestor(&db);
    let inserted = ingestor
        .ingest_feed(Category::Ai, &format!("{}/feed", server.uri()))
        .await
        .unwrap();

    // The two known entries are skipped without consuming the cap; the three
    // unseen ones all land.
    assert_eq!(inserted, 3);
    assert_eq!(db.count_content(Category::Ai).await.unwrap(), 5);
}

// ============================================================================
// Dedup
// ============================================================================

#[tokio::test]
async fn test_dedup_matches_guid_or_link() {
    let server = MockServer::start().await;
    let items = vec![
        // Same guid as a stored row, different link
        r#"<item><guid>known-guid</guid><title>A</title>
           <link>https://example.com/new-path</link>
           <pubDate>Fri, 01 Mar 2024 10:00:00 +0000</pubDate></item>"#
            .to_string(),
        // Different guid, same link as a stored row
        r#"<item><guid>fresh-guid</guid><title>B</title>
           <link>https://example.com/known</link>
           <pubDate>Fri, 01 Mar 2024 10:01:00 +0000</pubDate></item>"#
            .to_string(),
    ];
    mount_feed(&server, "/feed", rss_feed(Some("Tech Wire"), &items)).await;

    let db = test_db().await;
    db.insert_content(
        Category::Python,
        &stored_item("known-guid", "https://example.com/known"),
    )
    .await
    .unwrap();

    let ingestor = test_ingestor(&db);
    let inserted = ingestor
        .ingest_feed(Category::Python, &format!("{}/feed", server.uri()))
        .await
        .unwrap();

    assert_eq!(inserted, 0, "guid and link matches are both duplicates");
    assert_eq!(db.count_content(Category::Python).await.unwrap(), 1);
}

// ============================================================================
// Date handling
// ============================================================================

#[tokio::test]
async fn test_entries_without_parseable_dates_are_skipped() {
    let server = MockServer::start().await;
    let items = vec![
        r#"<item><guid>no-date</guid><title>A</title>
           <link>https://example.com/a</link></item>"#
            .to_string(),
        r#"<item><guid>bad-date</guid><title>B</title>
           <link>https://example.com/b</link>
           <pubDate>sometime next week</pubDate></item>"#
            .to_string(),
        r#"<item><guid>good-date</guid><title>C</title>
           <link>https://example.com/c</link>
           <pubDate>Fri, 01 Mar 2024 10:00:00 PST</pubDate></item>"#
            .to_string(),
    ];
    mount_feed(&server, "/feed", rss_feed(Some("Tech Wire"), &items)).await;

    let db = test_db().await;
    let ingestor = test_ingestor(&db);
    let inserted = ingestor
        .ingest_feed(Category::Cybersecurity, &format!("{}/feed", server.uri()))
        .await
        .unwrap();

    assert_eq!(inserted, 1);
    assert!(db
        .content_exists(Category::Cybersecurity, "good-date", "")
        .await
        .unwrap());
    assert!(!db
        .content_exists(Category::Cybersecurity, "no-date", "")
        .await
        .unwrap());
    assert!(!db
        .content_exists(Category::Cybersecurity, "bad-date", "")
        .await
        .unwrap());

    // PST entry is stored at its UTC instant (10:00 -0800 = 18:00 UTC).
    let records = db.recent_content(Category::Cybersecurity, 1).await.unwrap();
    assert_eq!(records[0].pub_date, 1709316000);
}

// ============================================================================
// Failure isolation and registry bookkeeping
// ============================================================================

#[tokio::test]
async fn test_feed_failure_does_not_abort_category_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bad"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let items = vec![rss_item_plain(1)];
    mount_feed(&server, "/good", rss_feed(Some("Imaging Weekly"), &items)).await;

    let db = test_db().await;
    let bad_id = db
        .add_source(
            "Broken",
            &format!("{}/bad", server.uri()),
            Category::MedicalNews,
        )
        .await
        .unwrap();
    let good_id = db
        .add_source(
            "Imaging Weekly",
            &format!("{}/good", server.uri()),
            Category::MedicalNews,
        )
        .await
        .unwrap();

    let ingestor = test_ingestor(&db);
    let summary = ingestor.run_category(Category::MedicalNews).await.unwrap();

    assert_eq!(summary.feeds_failed, 1);
    assert_eq!(summary.feeds_ok, 1);
    assert_eq!(summary.inserted, 1);

    let sources = db.list_sources(Some(Category::MedicalNews)).await.unwrap();
    let bad = sources.iter().find(|s| s.id == bad_id).unwrap();
    let good = sources.iter().find(|s| s.id == good_id).unwrap();
    assert!(bad.fetch_error.as_deref().unwrap_or("").contains("404"));
    assert!(bad.last_fetched.is_none());
    assert!(good.fetch_error.is_none());
    assert!(good.last_fetched.is_some());
}

#[tokio::test]
async fn test_inactive_sources_are_not_fetched() {
    let server = MockServer::start().await;
    let items = vec![rss_item_plain(1)];
    mount_feed(&server, "/feed", rss_feed(Some("Imaging Weekly"), &items)).await;

    let db = test_db().await;
    let id = db
        .add_source(
            "Disabled",
            &format!("{}/feed", server.uri()),
            Category::AiMedicalImaging,
        )
        .await
        .unwrap();
    db.set_source_active(id, false).await.unwrap();

    let ingestor = test_ingestor(&db);
    let summary = ingestor
        .run_category(Category::AiMedicalImaging)
        .await
        .unwrap();

    assert_eq!(summary.feeds_ok + summary.feeds_failed, 0);
    assert!(server.received_requests().await.unwrap().is_empty());
}

// ============================================================================
// Normalization
// ============================================================================

#[tokio::test]
async fn test_missing_channel_title_defaults_source_name() {
    let server = MockServer::start().await;
    let items = vec![rss_item_plain(1)];
    mount_feed(&server, "/feed", rss_feed(None, &items)).await;

    let db = test_db().await;
    let ingestor = test_ingestor(&db);
    let inserted = ingestor
        .ingest_feed(Category::MobilePc, &format!("{}/feed", server.uri()))
        .await
        .unwrap();

    assert_eq!(inserted, 1);
    let records = db.recent_content(Category::MobilePc, 1).await.unwrap();
    assert_eq!(records[0].source_name, "Technology");
}

#[tokio::test]
async fn test_entry_with_unreachable_image_is_stored_without_one() {
    let server = MockServer::start().await;
    // Image host answers, but not with an image.
    Mock::given(method("GET"))
        .and(path("/broken.gif"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not an image"))
        .mount(&server)
        .await;
    let items = vec![rss_item(1, &format!("{}/broken.gif", server.uri()))];
    mount_feed(&server, "/feed", rss_feed(Some("Tech Wire"), &items)).await;

    let db = test_db().await;
    let ingestor = test_ingestor(&db);
    let inserted = ingestor
        .ingest_feed(Category::UiUx, &format!("{}/feed", server.uri()))
        .await
        .unwrap();

    assert_eq!(inserted, 1, "image failures never reject the entry");
    let records = db.recent_content(Category::UiUx, 1).await.unwrap();
    assert_eq!(records[0].image, None);
}

// ============================================================================
// Retention
// ============================================================================

#[tokio::test]
async fn test_prune_all_deletes_only_expired_rows() {
    let db = test_db().await;
    let now = chrono::Utc::now().timestamp();

    let mut old = stored_item("old", "https://x/old");
    old.pub_date = now - 31 * 86400;
    let mut fresh = stored_item("fresh", "https://x/fresh");
    fresh.pub_date = now - 29 * 86400;
    let mut old_crypto = stored_item("old-crypto", "https://x/old-crypto");
    old_crypto.pub_date = now - 40 * 86400;

    db.insert_content(Category::General, &old).await.unwrap();
    db.insert_content(Category::General, &fresh).await.unwrap();
    db.insert_content(Category::Crypto, &old_crypto)
        .await
        .unwrap();

    let ingestor = test_ingestor(&db);
    let summary = ingestor.prune_all(30).await.unwrap();

    assert_eq!(summary.total, 2);
    let general = summary
        .per_category
        .iter()
        .find(|(c, _)| *c == Category::General)
        .unwrap();
    assert_eq!(general.1, 1);
    assert_eq!(db.count_content(Category::General).await.unwrap(), 1);
    assert_eq!(db.count_content(Category::Crypto).await.unwrap(), 0);

    // Idempotent: nothing is eligible the second time.
    let rerun = ingestor.prune_all(30).await.unwrap();
    assert_eq!(rerun.total, 0);
}
