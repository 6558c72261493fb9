//! Integration tests for the SQLite-backed crawl store.
//!
//! These cover:
//! 1. Content-addressed deduplication
//! 2. Cache freshness and failed-row exclusion
//! 3. History queries
//! 4. Body files going missing underneath a row
//! 5. Out-of-range ages and failed body writes

use chrono::Duration;
use crawlflow::core::{FetchResult, FetchStatus};
use crawlflow::store::{CrawlStore, PAGES_DIR};
use crawlflow::utils::now_utc;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

async fn open_store() -> (TempDir, CrawlStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = CrawlStore::open(dir.path(), "test.db").await.unwrap();
    (dir, store)
}

fn page(url: &str, title: &str, body: &str) -> FetchResult {
    FetchResult::new(url, "http").with_title(title).with_raw_body(body)
}

#[tokio::test]
async fn test_identical_content_is_saved_once() {
    let (dir, store) = open_store().await;
    let first = page("https://www.example.com/a", "A", "same body");

    let id = store.save(&first).await.unwrap();
    assert!(id > 0);
    assert_eq!(store.save(&first).await.unwrap(), 0);
    assert_eq!(store.count().await.unwrap(), 1);

    let rows = store.get_by_url("https://www.example.com/a").await.unwrap();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.domain, "example.com");
    assert_eq!(row.content_hash, first.content_fingerprint());
    assert_eq!(row.char_count, 9);

    let relative = row.file_path.clone().unwrap();
    assert!(relative.starts_with(&format!("{PAGES_DIR}/example.com/")));
    let on_disk = std::fs::read_to_string(dir.path().join(relative)).unwrap();
    assert_eq!(on_disk, "same body");
}

#[tokio::test]
async fn test_changed_content_adds_a_row() {
    let (_dir, store) = open_store().await;
    store.save(&page("https://example.com/a", "A", "v1")).await.unwrap();
    store.save(&page("https://example.com/a", "A", "v2")).await.unwrap();

    assert_eq!(store.count().await.unwrap(), 2);
    assert_eq!(store.get_by_url("https://example.com/a").await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_same_content_at_different_urls_is_kept() {
    let (_dir, store) = open_store().await;
    store.save(&page("https://example.com/a", "A", "shared")).await.unwrap();
    let id = store.save(&page("https://example.com/b", "B", "shared")).await.unwrap();

    assert!(id > 0);
    assert_eq!(store.count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_reduced_body_drives_fingerprint_and_file() {
    let (dir, store) = open_store().await;
    let result = page("https://example.com/r", "R", "raw with chrome").with_reduced_body("clean");
    store.save(&result).await.unwrap();

    let row = store.get_by_url("https://example.com/r").await.unwrap().remove(0);
    assert_eq!(row.char_count, 5);
    assert_eq!(store.read_body(&row).await, "clean");
    assert!(dir.path().join(row.file_path.unwrap()).exists());
}

#[tokio::test]
async fn test_get_cached_respects_max_age() {
    let (_dir, store) = open_store().await;
    let stale = page("https://example.com/old", "Old", "old body")
        .with_crawled_at(now_utc() - Duration::hours(2));
    store.save(&stale).await.unwrap();

    assert!(store.get_cached("https://example.com/old", 3600).await.unwrap().is_none());
    assert!(store.get_cached("https://example.com/old", 3 * 3600).await.unwrap().is_some());
}

#[tokio::test]
async fn test_get_cached_with_unrepresentable_age_has_no_lower_bound() {
    let (_dir, store) = open_store().await;
    let ancient = page("https://example.com/ancient", "Ancient", "old body")
        .with_crawled_at(now_utc() - Duration::days(365 * 50));
    store.save(&ancient).await.unwrap();

    for max_age in [i64::MAX, i64::MAX / 1000, 1_000_000_000_000_000] {
        let cached = store.get_cached("https://example.com/ancient", max_age).await.unwrap();
        assert_eq!(cached.map(|r| r.title), Some("Ancient".to_string()));
    }
    assert!(store.get_cached("https://example.com/missing", i64::MAX).await.unwrap().is_none());
}

#[tokio::test]
async fn test_get_cached_skips_failed_rows_and_prefers_newest() {
    let (_dir, store) = open_store().await;
    let url = "https://example.com/flaky";

    let older = page(url, "v1", "first body").with_crawled_at(now_utc() - Duration::minutes(10));
    store.save(&older).await.unwrap();
    store
        .save(&FetchResult::failed(url, "render", "connection reset"))
        .await
        .unwrap();

    let cached = store.get_cached(url, 3600).await.unwrap().unwrap();
    assert_eq!(cached.title, "v1");
    assert_eq!(cached.status, FetchStatus::Success);

    let newer = page(url, "v2", "second body");
    store.save(&newer).await.unwrap();
    let cached = store.get_cached(url, 3600).await.unwrap().unwrap();
    assert_eq!(cached.title, "v2");
}

#[tokio::test]
async fn test_failed_only_history_is_a_miss() {
    let (_dir, store) = open_store().await;
    let url = "https://down.example.com";
    let id = store.save(&FetchResult::failed(url, "http", "refused")).await.unwrap();
    assert!(id > 0);

    let rows = store.get_by_url(url).await.unwrap();
    assert_eq!(rows[0].status, FetchStatus::Failed);
    assert_eq!(rows[0].error.as_deref(), Some("refused"));
    assert!(rows[0].file_path.is_none());
    assert!(store.get_cached(url, 3600).await.unwrap().is_none());
}

#[tokio::test]
async fn test_search_domain_and_recent() {
    let (_dir, store) = open_store().await;
    store.save(&page("https://news.example.com/rust", "Rust 2.0 released", "a")).await.unwrap();
    store.save(&page("https://blog.other.org/go", "Go notes", "b")).await.unwrap();
    store.save(&page("https://news.example.com/100%", "Percent", "c")).await.unwrap();

    let hits = store.search("RUST", 10).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].title, "Rust 2.0 released");

    let hits = store.search("100%", 10).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].title, "Percent");

    assert_eq!(store.get_by_domain("news.example.com", 10).await.unwrap().len(), 2);
    assert_eq!(store.get_by_domain("other.org", 10).await.unwrap().len(), 0);

    let recent = store.recent(2).await.unwrap();
    assert_eq!(recent.len(), 2);
    assert!(recent[0].id > recent[1].id);
}

#[tokio::test]
async fn test_missing_body_file_reads_empty() {
    let (dir, store) = open_store().await;
    store.save(&page("https://example.com/gone", "Gone", "body")).await.unwrap();
    let row = store.get_by_url("https://example.com/gone").await.unwrap().remove(0);

    std::fs::remove_file(dir.path().join(row.file_path.as_ref().unwrap())).unwrap();
    assert_eq!(store.read_body(&row).await, "");
}

#[tokio::test]
async fn test_failed_body_write_leaves_no_row_and_resave_repairs() {
    let (dir, store) = open_store().await;
    let url = "https://blocked.example.com/a";
    let result = page(url, "Blocked", "body that must land on disk");

    // A plain file where the domain directory belongs makes the body write fail.
    let domain_dir = dir.path().join(PAGES_DIR).join("blocked.example.com");
    std::fs::write(&domain_dir, "not a directory").unwrap();

    assert!(store.save(&result).await.is_err());
    assert_eq!(store.count().await.unwrap(), 0);
    assert!(store.get_cached(url, 3600).await.unwrap().is_none());

    std::fs::remove_file(&domain_dir).unwrap();
    let id = store.save(&result).await.unwrap();
    assert!(id > 0);

    let cached = store.get_cached(url, 3600).await.unwrap().unwrap();
    assert_eq!(store.read_body(&cached).await, "body that must land on disk");
}

#[tokio::test]
async fn test_duplicate_save_restores_missing_body_file() {
    let (dir, store) = open_store().await;
    let result = page("https://example.com/restore", "Restore", "restorable body");
    store.save(&result).await.unwrap();
    let row = store.get_by_url("https://example.com/restore").await.unwrap().remove(0);
    let path = dir.path().join(row.file_path.as_ref().unwrap());
    std::fs::remove_file(&path).unwrap();

    assert_eq!(store.save(&result).await.unwrap(), 0);
    assert_eq!(store.count().await.unwrap(), 1);
    assert_eq!(store.read_body(&row).await, "restorable body");
}

#[tokio::test]
async fn test_reopen_keeps_rows() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store = CrawlStore::open(dir.path(), "test.db").await.unwrap();
        store.save(&page("https://example.com/a", "A", "body")).await.unwrap();
        store.close().await;
    }
    let store = CrawlStore::open(dir.path(), "test.db").await.unwrap();
    assert_eq!(store.count().await.unwrap(), 1);
}
