//! The per-request crawl pipeline.

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::OnceCell;
use tracing::{debug, error, warn};
use uuid::Uuid;

use super::CrawlOptions;
use crate::config::CrawlConfig;
use crate::core::{FetchResult, FetchStatus};
use crate::errors::CrawlflowError;
use crate::extract::QualityArbiter;
use crate::fetch::{FetchRequestConfig, FetchStrategy, StrategyKind};
use crate::observability::{FetchObserver, NoOpFetchObserver};
use crate::router::{Route, Router};
use crate::store::CrawlStore;

/// Seconds allowed on top of a fetch's own timeout and wait.
pub const FETCH_GRACE_SECONDS: f64 = 30.0;

/// Metadata key marking a result replayed from the store.
pub const FROM_CACHE_KEY: &str = "from_cache";
/// Metadata key holding the original crawl time of a cached result.
pub const CACHED_AT_KEY: &str = "cached_at";
/// Metadata key naming the strategy whose low yield triggered a fallback.
pub const FALLBACK_FROM_KEY: &str = "fallback_from";
/// Metadata key holding a storage error message.
pub const STORAGE_ERROR_KEY: &str = "storage_error";
/// Metadata key holding the saved row id (0 for a duplicate).
pub const RECORD_ID_KEY: &str = "record_id";

/// Orchestrates cache lookup, routing, fetching and post-processing.
pub struct Crawler {
    config: CrawlConfig,
    router: Router,
    arbiter: QualityArbiter,
    render: Arc<dyn FetchStrategy>,
    fast: Option<Arc<dyn FetchStrategy>>,
    store: OnceCell<CrawlStore>,
    observer: Arc<dyn FetchObserver>,
}

impl std::fmt::Debug for Crawler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Crawler")
            .field("render", &self.render.name())
            .field("static", &self.fast.as_ref().map(|s| s.name().to_string()))
            .field("storage_dir", &self.config.storage_dir)
            .finish_non_exhaustive()
    }
}

impl Crawler {
    /// Creates a crawler with only a full-render strategy.
    #[must_use]
    pub fn new(config: CrawlConfig, render: Arc<dyn FetchStrategy>) -> Self {
        Self {
            config,
            router: Router::default().with_static_available(false),
            arbiter: QualityArbiter::default(),
            render,
            fast: None,
            store: OnceCell::new(),
            observer: Arc::new(NoOpFetchObserver),
        }
    }

    /// Creates a crawler with the built-in HTTP and render-service strategies.
    #[cfg(feature = "fetchers")]
    #[must_use]
    pub fn from_config(config: CrawlConfig) -> Self {
        let render = Arc::new(crate::fetch::RenderStrategy::new(config.render_endpoint.clone()));
        Self::new(config, render).with_static_strategy(Arc::new(crate::fetch::HttpStrategy::new()))
    }

    /// Adds the lightweight strategy and enables static routing.
    #[must_use]
    pub fn with_static_strategy(mut self, strategy: Arc<dyn FetchStrategy>) -> Self {
        self.fast = Some(strategy);
        self.router = self.router.with_static_available(true);
        self
    }

    /// Replaces the router. Static routing follows the configured strategies.
    #[must_use]
    pub fn with_router(mut self, router: Router) -> Self {
        self.router = router.with_static_available(self.fast.is_some());
        self
    }

    /// Replaces the quality arbiter.
    #[must_use]
    pub fn with_arbiter(mut self, arbiter: QualityArbiter) -> Self {
        self.arbiter = arbiter;
        self
    }

    /// Uses an already-open store instead of opening one on demand.
    #[must_use]
    pub fn with_store(mut self, store: CrawlStore) -> Self {
        self.store = OnceCell::new_with(Some(store));
        self
    }

    /// Sets the event observer.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn FetchObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// The crawler configuration.
    #[must_use]
    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    /// The router.
    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// The store, opened on first use.
    pub async fn store(&self) -> Result<&CrawlStore, CrawlflowError> {
        self.store
            .get_or_try_init(|| CrawlStore::from_config(&self.config))
            .await
    }

    /// Crawls one address.
    ///
    /// Always returns a result; only a strategy-level failure yields
    /// [`FetchStatus::Failed`]. Strategies are closed before returning,
    /// including when a stage panics.
    pub async fn crawl(&self, url: &str, options: &CrawlOptions) -> FetchResult {
        let outcome = AssertUnwindSafe(self.crawl_one(url, options))
            .catch_unwind()
            .await;
        self.close_strategies().await;
        match outcome {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }

    pub(super) async fn crawl_one(&self, url: &str, options: &CrawlOptions) -> FetchResult {
        let request_id = Uuid::now_v7().to_string();

        if options.reads_cache() {
            if let Some(hit) = self.lookup_cache(url, &request_id).await {
                return hit;
            }
        }

        let route = self.router.route(url);
        let config = self.prepare_config(&route, options);
        let kind = options.strategy.unwrap_or(route.strategy);
        debug!(
            url = %url,
            request_id = %request_id,
            domain = %route.domain,
            strategy = %kind,
            policy = %route.policy.name,
            "Routed"
        );

        let strategy = self.strategy_for(kind);
        let mut result = self.fetch_with(strategy.as_ref(), url, &config, &request_id).await;

        if self.should_fall_back(strategy.as_ref(), &result, options) {
            debug!(url = %url, status = %result.status, "Low yield from static fetch; retrying with render");
            let from = strategy.name().to_string();
            let retried = self.fetch_with(self.render.as_ref(), url, &config, &request_id).await;
            if !(retried.is_failed() && result.status == FetchStatus::Partial) {
                result = retried.with_metadata(FALLBACK_FROM_KEY, serde_json::json!(from));
            }
        }

        if !result.is_failed() {
            result = self.arbitrate(result).await;
            result = route.policy.refine(result);
            self.observer
                .on_extract_complete(url, &request_id, result.char_count(), result.links.len());
        }

        if options.save {
            self.persist(&mut result).await;
        }
        result
    }

    fn strategy_for(&self, kind: StrategyKind) -> Arc<dyn FetchStrategy> {
        match (kind, &self.fast) {
            (StrategyKind::Static, Some(fast)) => Arc::clone(fast),
            _ => Arc::clone(&self.render),
        }
    }

    fn should_fall_back(&self, used: &dyn FetchStrategy, result: &FetchResult, options: &CrawlOptions) -> bool {
        self.config.fallback_to_render
            && options.strategy.is_none()
            && used.kind() == StrategyKind::Static
            && matches!(result.status, FetchStatus::Partial | FetchStatus::Failed)
    }

    /// Merges caller config with the policy and the proxy rule.
    fn prepare_config(&self, route: &Route, options: &CrawlOptions) -> FetchRequestConfig {
        let base = options
            .fetch_config
            .clone()
            .unwrap_or_else(|| self.config.default_fetch_config());
        let mut config = route.policy.customize(&base);
        if route.bypass_proxy && config.proxy.is_some() {
            debug!(domain = %route.domain, "Direct-connect domain; proxy cleared");
            config = config.with_proxy(None);
        }
        if route.policy.needs_login && config.cookie_file.is_none() {
            warn!(
                domain = %route.domain,
                policy = %route.policy.name,
                "Site requires login but no cookie file was given; expect partial content"
            );
        }
        config
    }

    /// Runs the arbiter's markup parse on the blocking pool.
    async fn arbitrate(&self, result: FetchResult) -> FetchResult {
        let arbiter = self.arbiter.clone();
        let unchanged = result.clone();
        match tokio::task::spawn_blocking(move || arbiter.arbitrate(result)).await {
            Ok(arbitrated) => arbitrated,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => {
                warn!(url = %unchanged.url, error = %e, "Arbitration cancelled; keeping strategy output");
                unchanged
            }
        }
    }

    async fn fetch_with(
        &self,
        strategy: &dyn FetchStrategy,
        url: &str,
        config: &FetchRequestConfig,
        request_id: &str,
    ) -> FetchResult {
        self.observer.on_fetch_start(url, request_id, strategy.name());
        let started = Instant::now();

        let outcome = match config.budget(FETCH_GRACE_SECONDS) {
            Ok(budget) => tokio::time::timeout(budget, strategy.fetch(url, config))
                .await
                .map_err(|_| budget),
            Err(e) => Ok(Err(e)),
        };
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        let error = match outcome {
            Ok(Ok(result)) => {
                self.observer
                    .on_fetch_complete(url, request_id, result.duration_ms, result.status);
                if result.is_failed() {
                    if let Some(ref e) = result.error {
                        self.observer.on_fetch_error(url, request_id, e);
                    }
                }
                return result;
            }
            Ok(Err(e)) => e,
            Err(budget) => CrawlflowError::Timeout {
                url: url.to_string(),
                seconds: budget.as_secs_f64(),
            },
        };

        let message = error.to_string();
        self.observer.on_fetch_error(url, request_id, &message);
        FetchResult::failed(url, strategy.name(), message).with_duration_ms(elapsed_ms)
    }

    async fn lookup_cache(&self, url: &str, request_id: &str) -> Option<FetchResult> {
        let store = match self.store().await {
            Ok(store) => store,
            Err(e) => {
                warn!(url = %url, error = %e, "Store unavailable; treating as cache miss");
                return None;
            }
        };
        let record = match store.get_cached(url, self.config.cache_max_age_seconds).await {
            Ok(Some(record)) if record.file_path.is_some() => record,
            Ok(_) => return None,
            Err(e) => {
                warn!(url = %url, error = %e, "Cache lookup failed; treating as miss");
                return None;
            }
        };

        let body = store.read_body(&record).await;
        self.observer.on_cache_hit(url, request_id, record.id);
        Some(
            FetchResult::new(record.url.clone(), record.strategy.clone())
                .with_title(record.title.clone())
                .with_raw_body(body)
                .with_status(FetchStatus::Cached)
                .with_crawled_at(record.crawled_at)
                .with_metadata(FROM_CACHE_KEY, serde_json::json!(true))
                .with_metadata(CACHED_AT_KEY, serde_json::json!(record.crawled_at.to_rfc3339())),
        )
    }

    /// Saves `result`; storage faults are recorded on the result, never raised.
    async fn persist(&self, result: &mut FetchResult) {
        let saved = match self.store().await {
            Ok(store) => store.save(result).await,
            Err(e) => Err(e),
        };
        match saved {
            Ok(id) => {
                result.metadata.insert(RECORD_ID_KEY.to_string(), serde_json::json!(id));
            }
            Err(e) => {
                error!(url = %result.url, error = %e, "Failed to persist crawl result");
                result
                    .metadata
                    .insert(STORAGE_ERROR_KEY.to_string(), serde_json::json!(e.to_string()));
            }
        }
    }

    pub(super) async fn close_strategies(&self) {
        self.render.close().await;
        if let Some(ref fast) = self.fast {
            fast.close().await;
        }
    }
}
