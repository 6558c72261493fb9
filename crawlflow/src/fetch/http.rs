//! Lightweight HTTP strategy for pages that need no script execution.
//!
//! GET with a browser-like user agent, convert the markup to markdown
//! locally. No noise reduction happens here, so `reduced_body` stays empty
//! and the quality arbiter decides whether a cleaner extraction exists.

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use scraper::Html;
use std::time::Instant;
use tracing::debug;

use super::{FetchRequestConfig, FetchStrategy, StrategyKind};
use crate::convert;
use crate::core::{FetchResult, FetchStatus};
use crate::errors::CrawlflowError;
use crate::policy::collapse_blank_lines;

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Strategy backed by a plain `reqwest` client.
#[derive(Debug, Default)]
pub struct HttpStrategy {
    /// Client and the proxy it was built for; built on first use.
    client: Mutex<Option<(Option<String>, reqwest::Client)>>,
}

impl HttpStrategy {
    /// Creates the strategy. No connection is opened until the first fetch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn client_for(&self, proxy: Option<&str>) -> Result<reqwest::Client, CrawlflowError> {
        let mut guard = self.client.lock();
        if let Some((built_for, client)) = guard.as_ref() {
            if built_for.as_deref() == proxy {
                return Ok(client.clone());
            }
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("text/html,application/xhtml+xml,*/*"));
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.9,zh-CN;q=0.8"),
        );

        let mut builder = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(10));
        if let Some(proxy) = proxy {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| CrawlflowError::config(format!("invalid proxy {proxy}: {e}")))?;
            builder = builder.proxy(proxy);
        }
        let client = builder
            .build()
            .map_err(|e| CrawlflowError::fetch(format!("failed to build HTTP client: {e}")))?;

        *guard = Some((proxy.map(str::to_string), client.clone()));
        Ok(client)
    }
}

#[async_trait]
impl FetchStrategy for HttpStrategy {
    fn name(&self) -> &str {
        "http"
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::Static
    }

    async fn fetch(&self, url: &str, config: &FetchRequestConfig) -> Result<FetchResult, CrawlflowError> {
        let client = self.client_for(config.proxy.as_deref())?;
        let started = Instant::now();

        let response = client
            .get(url)
            .timeout(config.timeout()?)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| CrawlflowError::fetch(e.to_string()))?;
        let html = response
            .text()
            .await
            .map_err(|e| CrawlflowError::fetch(e.to_string()))?;
        let duration_ms = started.elapsed().as_secs_f64() * 1000.0;

        let raw_body = collapse_blank_lines(&convert::html_to_markdown(&html)?);
        let (title, links) = {
            let document = Html::parse_document(&html);
            (
                convert::extract_title(&document),
                convert::extract_links(&document, url),
            )
        };

        debug!(url = %url, chars = raw_body.len(), links = links.len(), "HTTP fetch complete");

        let status = if raw_body.is_empty() {
            FetchStatus::Partial
        } else {
            FetchStatus::Success
        };
        Ok(FetchResult::new(url, self.name())
            .with_title(title)
            .with_raw_body(raw_body)
            .with_html(html)
            .with_links(links)
            .with_status(status)
            .with_duration_ms(duration_ms))
    }

    async fn close(&self) {
        self.client.lock().take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity() {
        let strategy = HttpStrategy::new();
        assert_eq!(strategy.name(), "http");
        assert_eq!(strategy.kind(), StrategyKind::Static);
    }

    #[test]
    fn test_client_is_reused_for_same_proxy() {
        let strategy = HttpStrategy::new();
        strategy.client_for(None).unwrap();
        assert!(strategy.client.lock().is_some());
        strategy.client_for(None).unwrap();
        assert_eq!(strategy.client.lock().as_ref().map(|(p, _)| p.clone()), Some(None));
    }

    #[test]
    fn test_proxy_change_rebuilds_client() {
        let strategy = HttpStrategy::new();
        strategy.client_for(None).unwrap();
        strategy.client_for(Some("http://127.0.0.1:7897")).unwrap();
        assert_eq!(
            strategy.client.lock().as_ref().and_then(|(p, _)| p.clone()).as_deref(),
            Some("http://127.0.0.1:7897")
        );
    }

    #[tokio::test]
    async fn test_close_drops_client() {
        let strategy = HttpStrategy::new();
        strategy.client_for(None).unwrap();
        strategy.close().await;
        assert!(strategy.client.lock().is_none());
        strategy.close().await;
    }
}
