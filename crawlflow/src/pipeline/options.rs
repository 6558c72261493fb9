//! Per-call crawl options.

use crate::fetch::{FetchRequestConfig, StrategyKind};

/// Options for one [`Crawler::crawl`](super::Crawler::crawl) or batch call.
#[derive(Debug, Clone, Default)]
pub struct CrawlOptions {
    /// Persist results and allow cache reads.
    pub save: bool,
    /// Skip the cache lookup even when `save` is set.
    pub no_cache: bool,
    /// Fetch configuration; the crawler's defaults apply when unset.
    pub fetch_config: Option<FetchRequestConfig>,
    /// Bypass routing and use this strategy family.
    pub strategy: Option<StrategyKind>,
}

impl CrawlOptions {
    /// Creates default options: no persistence, routed strategy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Persists results and allows cache hits.
    #[must_use]
    pub fn saving(mut self) -> Self {
        self.save = true;
        self
    }

    /// Forces a fresh fetch.
    #[must_use]
    pub fn fresh(mut self) -> Self {
        self.no_cache = true;
        self
    }

    /// Sets the fetch configuration.
    #[must_use]
    pub fn with_fetch_config(mut self, config: FetchRequestConfig) -> Self {
        self.fetch_config = Some(config);
        self
    }

    /// Forces a strategy family.
    #[must_use]
    pub fn forcing(mut self, kind: StrategyKind) -> Self {
        self.strategy = Some(kind);
        self
    }

    /// Whether the cache should be consulted.
    #[must_use]
    pub fn reads_cache(&self) -> bool {
        self.save && !self.no_cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_cache() {
        assert!(!CrawlOptions::new().reads_cache());
        assert!(CrawlOptions::new().saving().reads_cache());
        assert!(!CrawlOptions::new().saving().fresh().reads_cache());
        assert!(!CrawlOptions::new().fresh().reads_cache());
    }
}
