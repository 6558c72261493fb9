//! Scripted strategies and recording observers.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::core::{FetchResult, FetchStatus};
use crate::errors::CrawlflowError;
use crate::fetch::{FetchRequestConfig, FetchStrategy, StrategyKind};
use crate::observability::FetchObserver;

/// A canned answer for one address.
#[derive(Debug, Clone)]
pub enum Scripted {
    /// Return this result (its address is replaced with the requested one).
    Result(FetchResult),
    /// Return a fetch error.
    Error(String),
    /// Never answer within any reasonable budget.
    Hang,
    /// Panic inside the strategy.
    Panic,
}

/// A [`FetchStrategy`] that answers from a script and records every call.
#[derive(Debug)]
pub struct ScriptedStrategy {
    name: String,
    kind: StrategyKind,
    script: HashMap<String, Scripted>,
    fallback: Option<Scripted>,
    delay: Option<Duration>,
    calls: Mutex<Vec<(String, FetchRequestConfig)>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    closes: AtomicUsize,
}

impl ScriptedStrategy {
    /// Creates a strategy with the given name and kind.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: StrategyKind) -> Self {
        Self {
            name: name.into(),
            kind,
            script: HashMap::new(),
            fallback: None,
            delay: None,
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            closes: AtomicUsize::new(0),
        }
    }

    /// A full-render strategy named `render`.
    #[must_use]
    pub fn render() -> Self {
        Self::new("render", StrategyKind::Render)
    }

    /// A lightweight strategy named `http`.
    #[must_use]
    pub fn fast() -> Self {
        Self::new("http", StrategyKind::Static)
    }

    /// Scripts a result for `url`.
    #[must_use]
    pub fn with_response(mut self, url: impl Into<String>, result: FetchResult) -> Self {
        self.script.insert(url.into(), Scripted::Result(result));
        self
    }

    /// Scripts a fetch error for `url`.
    #[must_use]
    pub fn with_error(mut self, url: impl Into<String>, message: impl Into<String>) -> Self {
        self.script.insert(url.into(), Scripted::Error(message.into()));
        self
    }

    /// Scripts an arbitrary answer for `url`.
    #[must_use]
    pub fn with_scripted(mut self, url: impl Into<String>, answer: Scripted) -> Self {
        self.script.insert(url.into(), answer);
        self
    }

    /// Answer for unscripted addresses.
    #[must_use]
    pub fn with_default(mut self, answer: Scripted) -> Self {
        self.fallback = Some(answer);
        self
    }

    /// Sleeps before every answer.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of fetches so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Requested addresses, in call order.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().iter().map(|(url, _)| url.clone()).collect()
    }

    /// Configuration passed with the most recent fetch.
    #[must_use]
    pub fn last_config(&self) -> Option<FetchRequestConfig> {
        self.calls.lock().last().map(|(_, config)| config.clone())
    }

    /// Highest number of simultaneous fetches observed.
    #[must_use]
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Number of `close` calls.
    #[must_use]
    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    fn answer_for(&self, url: &str) -> Scripted {
        self.script
            .get(url)
            .or(self.fallback.as_ref())
            .cloned()
            .unwrap_or_else(|| {
                Scripted::Result(
                    FetchResult::new(url, &self.name).with_raw_body(format!("Scripted content for {url}")),
                )
            })
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl FetchStrategy for ScriptedStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> StrategyKind {
        self.kind
    }

    async fn fetch(&self, url: &str, config: &FetchRequestConfig) -> Result<FetchResult, CrawlflowError> {
        self.calls.lock().push((url.to_string(), config.clone()));
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match self.answer_for(url) {
            Scripted::Result(mut result) => {
                url.clone_into(&mut result.url);
                self.name.clone_into(&mut result.strategy);
                Ok(result)
            }
            Scripted::Error(message) => Err(CrawlflowError::fetch(message)),
            Scripted::Hang => {
                std::future::pending::<()>().await;
                Ok(FetchResult::new(url, &self.name).with_status(FetchStatus::Failed))
            }
            Scripted::Panic => panic!("scripted panic for {url}"),
        }
    }

    async fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Observer that keeps every event as a `kind:url` string.
#[derive(Debug, Default)]
pub struct CollectingFetchObserver {
    events: Mutex<Vec<String>>,
}

impl CollectingFetchObserver {
    /// Creates an empty observer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All events so far.
    #[must_use]
    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    /// Number of events of `kind` (`start`, `complete`, `error`, `extract`, `cache_hit`).
    #[must_use]
    pub fn count(&self, kind: &str) -> usize {
        let prefix = format!("{kind}:");
        self.events.lock().iter().filter(|e| e.starts_with(&prefix)).count()
    }

    fn push(&self, kind: &str, url: &str) {
        self.events.lock().push(format!("{kind}:{url}"));
    }
}

impl FetchObserver for CollectingFetchObserver {
    fn on_fetch_start(&self, url: &str, _request_id: &str, _strategy: &str) {
        self.push("start", url);
    }

    fn on_fetch_complete(&self, url: &str, _request_id: &str, _duration_ms: f64, _status: FetchStatus) {
        self.push("complete", url);
    }

    fn on_fetch_error(&self, url: &str, _request_id: &str, _error: &str) {
        self.push("error", url);
    }

    fn on_extract_complete(&self, url: &str, _request_id: &str, _char_count: usize, _links_count: usize) {
        self.push("extract", url);
    }

    fn on_cache_hit(&self, url: &str, _request_id: &str, _record_id: i64) {
        self.push("cache_hit", url);
    }
}
