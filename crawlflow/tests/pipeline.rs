//! Integration tests for the crawl pipeline.
//!
//! These drive `Crawler` end to end with scripted strategies:
//! 1. Site policy cleanup and low-yield detection
//! 2. Cache hits (including unbounded ages), forced refetches and failed-result auditing
//! 3. Storage faults isolated from the crawl
//! 4. Bounded, order-preserving batches

use std::sync::Arc;
use std::time::Duration;

use crawlflow::config::CrawlConfig;
use crawlflow::core::{FetchResult, FetchStatus};
use crawlflow::fetch::FetchStrategy;
use crawlflow::observability::FetchObserver;
use crawlflow::pipeline::{
    CrawlOptions, Crawler, FROM_CACHE_KEY, PIPELINE_STRATEGY, RECORD_ID_KEY, STORAGE_ERROR_KEY,
};
use crawlflow::policy::HINT_KEY;
use crawlflow::testing::{fixtures, CollectingFetchObserver, Scripted, ScriptedStrategy};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn crawler_in(dir: &TempDir, render: &Arc<ScriptedStrategy>) -> Crawler {
    let config = CrawlConfig::default().with_storage_dir(dir.path());
    Crawler::new(config, Arc::clone(render) as Arc<dyn FetchStrategy>)
}

#[tokio::test]
async fn test_hacker_news_is_rendered_cleaned_and_flagged() {
    let url = "https://news.ycombinator.com/";
    let dir = tempfile::tempdir().unwrap();
    let render = Arc::new(
        ScriptedStrategy::render()
            .with_response(url, FetchResult::new(url, "render").with_raw_body(fixtures::HN_MARKDOWN)),
    );
    let fast = Arc::new(ScriptedStrategy::fast());
    let crawler = crawler_in(&dir, &render).with_static_strategy(Arc::clone(&fast) as Arc<dyn FetchStrategy>);

    let result = crawler.crawl(url, &CrawlOptions::new()).await;

    assert_eq!(fast.call_count(), 0);
    assert_eq!(result.strategy, "render");
    assert!(result.raw_body.contains("Show HN: A tiny crawler"));
    assert!(!result.raw_body.contains("| --- |"));
    assert!(!result.raw_body.contains("| | | | |"));
    assert_eq!(result.reduced_body, result.raw_body);
    assert_eq!(result.status, FetchStatus::Partial);
    let hint = result.metadata[HINT_KEY].as_str().unwrap();
    assert!(hint.contains("https://hacker-news.firebaseio.com/v0/"));
}

#[tokio::test]
async fn test_second_crawl_is_served_from_cache() {
    let url = "https://example.com/story";
    let dir = tempfile::tempdir().unwrap();
    let render = Arc::new(ScriptedStrategy::render().with_response(url, fixtures::article_result(url, "render")));
    let observer = Arc::new(CollectingFetchObserver::new());
    let crawler = crawler_in(&dir, &render).with_observer(Arc::clone(&observer) as Arc<dyn FetchObserver>);
    let options = CrawlOptions::new().saving();

    let first = crawler.crawl(url, &options).await;
    assert_eq!(first.status, FetchStatus::Success);
    assert!(first.metadata[RECORD_ID_KEY].as_i64().unwrap() > 0);

    let second = crawler.crawl(url, &options).await;
    assert_eq!(render.call_count(), 1);
    assert_eq!(second.status, FetchStatus::Cached);
    assert_eq!(second.metadata.get(FROM_CACHE_KEY), Some(&serde_json::json!(true)));
    assert_eq!(second.title, first.title);
    assert_eq!(second.strategy, "render");
    assert_eq!(second.raw_body, first.preferred_body());
    assert_eq!(observer.count("cache_hit"), 1);

    let store = crawler.store().await.unwrap();
    assert_eq!(store.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_unbounded_cache_age_still_serves_cache() {
    let url = "https://example.com/forever";
    let dir = tempfile::tempdir().unwrap();
    let render = Arc::new(ScriptedStrategy::render().with_response(url, fixtures::article_result(url, "render")));
    let config = CrawlConfig {
        cache_max_age_seconds: i64::MAX,
        ..CrawlConfig::default().with_storage_dir(dir.path())
    };
    let crawler = Crawler::new(config, Arc::clone(&render) as Arc<dyn FetchStrategy>);
    let options = CrawlOptions::new().saving();

    assert_eq!(crawler.crawl(url, &options).await.status, FetchStatus::Success);
    assert_eq!(crawler.crawl(url, &options).await.status, FetchStatus::Cached);
    assert_eq!(render.call_count(), 1);
}

#[tokio::test]
async fn test_no_cache_forces_refetch_and_dedupes() {
    let url = "https://example.com/story";
    let dir = tempfile::tempdir().unwrap();
    let render = Arc::new(ScriptedStrategy::render().with_response(url, fixtures::article_result(url, "render")));
    let crawler = crawler_in(&dir, &render);

    let _ = crawler.crawl(url, &CrawlOptions::new().saving()).await;
    let again = crawler.crawl(url, &CrawlOptions::new().saving().fresh()).await;

    assert_eq!(render.call_count(), 2);
    assert_eq!(again.status, FetchStatus::Success);
    assert_eq!(again.metadata.get(RECORD_ID_KEY), Some(&serde_json::json!(0)));
    assert_eq!(crawler.store().await.unwrap().count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_unsaved_crawl_never_reads_cache() {
    let url = "https://example.com/story";
    let dir = tempfile::tempdir().unwrap();
    let render = Arc::new(ScriptedStrategy::render());
    let crawler = crawler_in(&dir, &render);

    let _ = crawler.crawl(url, &CrawlOptions::new().saving()).await;
    let plain = crawler.crawl(url, &CrawlOptions::new()).await;

    assert_eq!(render.call_count(), 2);
    assert_eq!(plain.status, FetchStatus::Success);
    assert!(!plain.metadata.contains_key(RECORD_ID_KEY));
}

#[tokio::test]
async fn test_failed_crawl_is_audited_but_not_cached() {
    let url = "https://down.example.com/";
    let dir = tempfile::tempdir().unwrap();
    let render = Arc::new(ScriptedStrategy::render().with_error(url, "connection refused"));
    let crawler = crawler_in(&dir, &render);
    let options = CrawlOptions::new().saving();

    let first = crawler.crawl(url, &options).await;
    assert!(first.is_failed());
    let second = crawler.crawl(url, &options).await;
    assert!(second.is_failed());
    assert_eq!(render.call_count(), 2);

    let rows = crawler.store().await.unwrap().get_by_url(url).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, FetchStatus::Failed);
}

#[tokio::test]
async fn test_missing_cached_body_yields_empty_cached_result() {
    let url = "https://example.com/story";
    let dir = tempfile::tempdir().unwrap();
    let render = Arc::new(ScriptedStrategy::render());
    let crawler = crawler_in(&dir, &render);
    let options = CrawlOptions::new().saving();

    let _ = crawler.crawl(url, &options).await;
    let row = crawler.store().await.unwrap().get_by_url(url).await.unwrap().remove(0);
    std::fs::remove_file(dir.path().join(row.file_path.unwrap())).unwrap();

    let cached = crawler.crawl(url, &options).await;
    assert_eq!(cached.status, FetchStatus::Cached);
    assert_eq!(cached.raw_body, "");
    assert_eq!(render.call_count(), 1);
}

#[tokio::test]
async fn test_storage_fault_is_recorded_not_raised() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, "x").unwrap();

    let render = Arc::new(ScriptedStrategy::render());
    let config = CrawlConfig::default().with_storage_dir(&blocker);
    let crawler = Crawler::new(config, Arc::clone(&render) as Arc<dyn FetchStrategy>);

    let result = crawler.crawl("https://example.com/a", &CrawlOptions::new().saving()).await;
    assert_eq!(result.status, FetchStatus::Success);
    assert!(result.metadata.contains_key(STORAGE_ERROR_KEY));
    assert_eq!(render.call_count(), 1);
}

#[tokio::test]
async fn test_batch_preserves_order_and_bounds_concurrency() {
    let dir = tempfile::tempdir().unwrap();
    let urls: Vec<String> = (0..6).map(|i| format!("https://example.com/{i}")).collect();
    let render = Arc::new(
        ScriptedStrategy::render()
            .with_delay(Duration::from_millis(20))
            .with_error(urls[3].clone(), "boom"),
    );
    let config = CrawlConfig::default()
        .with_storage_dir(dir.path())
        .with_max_concurrency(2);
    let crawler = Crawler::new(config, Arc::clone(&render) as Arc<dyn FetchStrategy>);

    let results = crawler.crawl_batch(&urls, &CrawlOptions::new()).await;

    let returned: Vec<&str> = results.iter().map(|r| r.url.as_str()).collect();
    let expected: Vec<&str> = urls.iter().map(String::as_str).collect();
    assert_eq!(returned, expected);
    assert!(results[3].is_failed());
    assert_eq!(results.iter().filter(|r| r.is_failed()).count(), 1);
    assert_eq!(render.call_count(), 6);
    assert!(render.peak_concurrency() <= 2);
    assert_eq!(render.close_count(), 1);
}

#[tokio::test]
async fn test_batch_contains_panicking_item() {
    let dir = tempfile::tempdir().unwrap();
    let urls = vec![
        "https://example.com/ok".to_string(),
        "https://example.com/panic".to_string(),
        "https://example.com/also-ok".to_string(),
    ];
    let render = Arc::new(ScriptedStrategy::render().with_scripted(urls[1].clone(), Scripted::Panic));
    let crawler = crawler_in(&dir, &render);

    let results = crawler.crawl_batch(&urls, &CrawlOptions::new()).await;

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].status, FetchStatus::Success);
    assert!(results[1].is_failed());
    assert_eq!(results[1].strategy, PIPELINE_STRATEGY);
    assert_eq!(results[2].status, FetchStatus::Success);
}

#[tokio::test]
async fn test_empty_batch() {
    let dir = tempfile::tempdir().unwrap();
    let render = Arc::new(ScriptedStrategy::render());
    let results = crawler_in(&dir, &render).crawl_batch(&[], &CrawlOptions::new()).await;
    assert!(results.is_empty());
    assert_eq!(render.call_count(), 0);
}
