//! Full-render strategy backed by a Crawl4AI-compatible rendering service.
//!
//! The service runs the headless browser; this side only builds the
//! `/crawl` request from a [`FetchRequestConfig`] and maps the response
//! back onto a [`FetchResult`].

use async_trait::async_trait;
use base64::Engine;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, warn};

use super::{FetchRequestConfig, FetchStrategy, StrategyKind};
use crate::core::{FetchResult, FetchStatus};
use crate::errors::CrawlflowError;

/// Tags the service drops before producing the reduced body.
pub const EXCLUDED_TAGS: &[&str] = &["nav", "footer", "header", "aside", "noscript"];

/// Selectors for page chrome the service drops before producing the reduced body.
pub const EXCLUDED_SELECTORS: &[&str] = &[
    "[role='navigation']",
    "[role='banner']",
    "[role='contentinfo']",
    ".navbar",
    ".menu-bar",
    ".site-footer",
    ".cookie-banner",
    ".advertisement",
    "#cookie-consent",
    "#cookie-banner",
    "[class*='cookie']",
    "[id*='cookie']",
    "[class*='advert']",
    "[class*='sponsor']",
    ".sidebar",
    "[role='complementary']",
    "aside",
    ".social-share",
    ".share-buttons",
    "[class*='share']",
    ".related-articles",
    ".recommended",
    "[class*='related']",
    ".newsletter-signup",
    ".subscribe-form",
    "[class*='popup']",
    "[class*='modal']",
    "[class*='overlay']",
    "[class*='skip-to']",
    ".skip-navigation",
];

/// Seconds added to the page timeout for the service round trip.
const SERVICE_GRACE_SECONDS: f64 = 15.0;

/// Strategy that delegates rendering to a remote browser service.
#[derive(Debug)]
pub struct RenderStrategy {
    endpoint: String,
    client: Mutex<Option<reqwest::Client>>,
}

impl RenderStrategy {
    /// Creates a strategy for the service at `endpoint` (e.g. `http://127.0.0.1:11235`).
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            client: Mutex::new(None),
        }
    }

    /// The service base address.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn client(&self) -> reqwest::Client {
        self.client
            .lock()
            .get_or_insert_with(reqwest::Client::new)
            .clone()
    }
}

/// Builds the `/crawl` request body.
#[must_use]
pub fn build_request(url: &str, config: &FetchRequestConfig, cookies: Option<serde_json::Value>) -> serde_json::Value {
    let mut browser = json!({
        "headless": config.headless,
        "enable_stealth": config.stealth,
        "verbose": config.verbose,
    });
    if let Some(ref proxy) = config.proxy {
        browser["proxy"] = json!(proxy);
    }
    if let Some(cookies) = cookies {
        browser["cookies"] = cookies;
    }

    let mut run = json!({
        "page_timeout": (config.timeout_seconds * 1000.0).round(),
        "verbose": config.verbose,
        "excluded_tags": EXCLUDED_TAGS,
        "excluded_selector": EXCLUDED_SELECTORS.join(","),
        "remove_overlay_elements": true,
        "exclude_external_images": true,
        "screenshot": config.screenshot,
    });
    if let Some(ref selector) = config.selector {
        run["css_selector"] = json!(selector);
    }
    if config.wait_seconds > 0.0 {
        run["delay_before_return_html"] = json!(config.wait_seconds);
    }
    if config.scroll {
        run["scan_full_page"] = json!(true);
    }
    if let Some(ref js) = config.js_code {
        run["js_code"] = json!(js);
    }
    if let Some(wait_for) = config.wait_for() {
        run["wait_for"] = json!(format!("css:{wait_for}"));
    }

    json!({
        "urls": [url],
        "browser_config": { "type": "BrowserConfig", "params": browser },
        "crawler_config": { "type": "CrawlerRunConfig", "params": run },
    })
}

#[derive(Debug, Deserialize)]
struct CrawlResponse {
    #[serde(default)]
    results: Vec<PageResult>,
}

#[derive(Debug, Default, Deserialize)]
struct PageResult {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    html: Option<String>,
    #[serde(default)]
    markdown: Option<MarkdownField>,
    #[serde(default)]
    metadata: Option<HashMap<String, serde_json::Value>>,
    #[serde(default)]
    links: Option<HashMap<String, Vec<LinkEntry>>>,
    #[serde(default)]
    screenshot: Option<String>,
}

/// Older service versions return markdown as a bare string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MarkdownField {
    Parts {
        #[serde(default)]
        raw_markdown: Option<String>,
        #[serde(default)]
        fit_markdown: Option<String>,
    },
    Plain(String),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LinkEntry {
    Object { href: String },
    Plain(String),
}

fn into_result(url: &str, name: &str, page: PageResult, duration_ms: f64) -> FetchResult {
    if !page.success {
        let error = page
            .error_message
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| "unknown error".to_string());
        return FetchResult::failed(url, name, error).with_duration_ms(duration_ms);
    }

    let (raw_body, reduced_body) = match page.markdown {
        Some(MarkdownField::Parts { raw_markdown, fit_markdown }) => {
            (raw_markdown.unwrap_or_default(), fit_markdown.unwrap_or_default())
        }
        Some(MarkdownField::Plain(md)) => (md, String::new()),
        None => (String::new(), String::new()),
    };

    let title = page
        .metadata
        .as_ref()
        .and_then(|m| m.get("title"))
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default()
        .to_string();

    let mut links = Vec::new();
    if let Some(groups) = page.links {
        for group in ["internal", "external"] {
            for entry in groups.get(group).into_iter().flatten() {
                match entry {
                    LinkEntry::Object { href } | LinkEntry::Plain(href) => links.push(href.clone()),
                }
            }
        }
    }

    let status = if raw_body.is_empty() && reduced_body.is_empty() {
        FetchStatus::Partial
    } else {
        FetchStatus::Success
    };

    let mut result = FetchResult::new(url, name)
        .with_title(title)
        .with_raw_body(raw_body)
        .with_reduced_body(reduced_body)
        .with_links(links)
        .with_status(status)
        .with_duration_ms(duration_ms);
    if let Some(html) = page.html.filter(|h| !h.is_empty()) {
        result = result.with_html(html);
    }
    if let Some(encoded) = page.screenshot.filter(|s| !s.is_empty()) {
        match base64::engine::general_purpose::STANDARD.decode(encoded.as_bytes()) {
            Ok(png) => result = result.with_screenshot(png),
            Err(e) => warn!(url = %url, error = %e, "Discarding undecodable screenshot"),
        }
    }
    result
}

async fn load_cookies(path: &Path) -> Option<serde_json::Value> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => match serde_json::from_str::<serde_json::Value>(&text) {
            Ok(cookies) if cookies.is_array() => Some(cookies),
            Ok(_) => {
                warn!(path = %path.display(), "Cookie file is not a JSON list; ignoring");
                None
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Cookie file is not valid JSON; ignoring");
                None
            }
        },
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Cookie file unreadable; ignoring");
            None
        }
    }
}

#[async_trait]
impl FetchStrategy for RenderStrategy {
    fn name(&self) -> &str {
        "render"
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::Render
    }

    async fn fetch(&self, url: &str, config: &FetchRequestConfig) -> Result<FetchResult, CrawlflowError> {
        let cookies = match config.cookie_file {
            Some(ref path) => load_cookies(path).await,
            None => None,
        };
        let body = build_request(url, config, cookies);
        let budget = config.budget(SERVICE_GRACE_SECONDS)?;

        let started = Instant::now();
        let response = self
            .client()
            .post(format!("{}/crawl", self.endpoint))
            .timeout(budget)
            .json(&body)
            .send()
            .await
            .map_err(|e| CrawlflowError::fetch(format!("render service request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(CrawlflowError::fetch(format!(
                "render service error (status {status}): {text}"
            )));
        }

        let parsed: CrawlResponse = response
            .json()
            .await
            .map_err(|e| CrawlflowError::fetch(format!("invalid render service response: {e}")))?;
        let duration_ms = started.elapsed().as_secs_f64() * 1000.0;

        let page = parsed
            .results
            .into_iter()
            .next()
            .ok_or_else(|| CrawlflowError::fetch("render service returned no results"))?;
        debug!(url = %url, success = page.success, "Render service responded");

        Ok(into_result(url, self.name(), page, duration_ms))
    }

    async fn close(&self) {
        self.client.lock().take();
    }
}
