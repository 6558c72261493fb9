//! Bounded-concurrency batch crawling.

use futures::{stream, FutureExt, StreamExt};
use std::panic::AssertUnwindSafe;
use tracing::{error, info};

use super::{CrawlOptions, Crawler};
use crate::core::FetchResult;

/// Strategy name recorded when a batch item aborts inside the pipeline.
pub const PIPELINE_STRATEGY: &str = "pipeline";

impl Crawler {
    /// Crawls `urls` with at most `max_concurrency` requests in flight.
    ///
    /// Results come back in input order. A panic inside one item becomes a
    /// failed result for that item; the rest of the batch still runs.
    pub async fn crawl_batch(&self, urls: &[String], options: &CrawlOptions) -> Vec<FetchResult> {
        let limit = self.config().max_concurrency.max(1);
        info!(count = urls.len(), max_concurrency = limit, "Starting batch");

        let results: Vec<FetchResult> = stream::iter(urls.iter().map(|url| async move {
            match AssertUnwindSafe(self.crawl_one(url, options)).catch_unwind().await {
                Ok(result) => result,
                Err(_) => {
                    error!(url = %url, "Pipeline panicked for batch item");
                    FetchResult::failed(url.as_str(), PIPELINE_STRATEGY, "internal error while crawling")
                }
            }
        }))
        .buffered(limit)
        .collect()
        .await;

        self.close_strategies().await;

        let failed = results.iter().filter(|r| r.is_failed()).count();
        info!(count = results.len(), failed, "Batch complete");
        results
    }
}
