//! Observer callbacks for pipeline events.

use tracing::{debug, info, warn};

use crate::core::FetchStatus;

/// Observability callbacks for crawl requests.
///
/// Every request carries a request id (UUID v7) so callbacks from
/// concurrent batch items can be told apart.
pub trait FetchObserver: Send + Sync {
    /// Called before a strategy is invoked.
    fn on_fetch_start(&self, url: &str, request_id: &str, strategy: &str);

    /// Called when a strategy returned a result.
    fn on_fetch_complete(&self, url: &str, request_id: &str, duration_ms: f64, status: FetchStatus);

    /// Called when a strategy failed or timed out.
    fn on_fetch_error(&self, url: &str, request_id: &str, error: &str);

    /// Called after arbitration and refinement.
    fn on_extract_complete(&self, url: &str, request_id: &str, char_count: usize, links_count: usize);

    /// Called when a request is answered from the store.
    fn on_cache_hit(&self, url: &str, request_id: &str, record_id: i64);
}

/// No-op implementation of [`FetchObserver`].
#[derive(Debug, Clone, Default)]
pub struct NoOpFetchObserver;

impl FetchObserver for NoOpFetchObserver {
    fn on_fetch_start(&self, _url: &str, _request_id: &str, _strategy: &str) {}
    fn on_fetch_complete(&self, _url: &str, _request_id: &str, _duration_ms: f64, _status: FetchStatus) {}
    fn on_fetch_error(&self, _url: &str, _request_id: &str, _error: &str) {}
    fn on_extract_complete(&self, _url: &str, _request_id: &str, _char_count: usize, _links_count: usize) {}
    fn on_cache_hit(&self, _url: &str, _request_id: &str, _record_id: i64) {}
}

/// Observer that reports every event through `tracing`.
#[derive(Debug, Clone, Default)]
pub struct LoggingFetchObserver;

impl FetchObserver for LoggingFetchObserver {
    fn on_fetch_start(&self, url: &str, request_id: &str, strategy: &str) {
        debug!(url = %url, request_id = %request_id, strategy = %strategy, "Fetch started");
    }

    fn on_fetch_complete(&self, url: &str, request_id: &str, duration_ms: f64, status: FetchStatus) {
        info!(
            url = %url,
            request_id = %request_id,
            duration_ms,
            status = %status,
            "Fetch complete"
        );
    }

    fn on_fetch_error(&self, url: &str, request_id: &str, error: &str) {
        warn!(url = %url, request_id = %request_id, error = %error, "Fetch failed");
    }

    fn on_extract_complete(&self, url: &str, request_id: &str, char_count: usize, links_count: usize) {
        debug!(
            url = %url,
            request_id = %request_id,
            char_count,
            links_count,
            "Content ready"
        );
    }

    fn on_cache_hit(&self, url: &str, request_id: &str, record_id: i64) {
        info!(url = %url, request_id = %request_id, record_id, "Served from cache");
    }
}
