//! The canonical fetch result record.

use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

use super::status::FetchStatus;

/// Length of the hex content fingerprint.
pub const FINGERPRINT_LEN: usize = 16;

/// Result produced by every fetch, whatever strategy served it.
///
/// `domain`, `content_fingerprint` and `char_count` are derived on demand
/// and never stored, so they always agree with the current bodies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchResult {
    /// The address that was requested.
    pub url: String,
    /// Document title, empty if unknown.
    #[serde(default)]
    pub title: String,
    /// Full converted markdown.
    #[serde(default)]
    pub raw_body: String,
    /// Noise-reduced markdown.
    #[serde(default)]
    pub reduced_body: String,
    /// Raw markup, when the strategy kept it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    /// PNG screenshot bytes.
    #[serde(skip)]
    pub screenshot: Option<Vec<u8>>,
    /// Links discovered in the document.
    #[serde(default)]
    pub links: Vec<String>,
    /// Name of the strategy that produced the result.
    pub strategy: String,
    /// Outcome.
    #[serde(default)]
    pub status: FetchStatus,
    /// Error text for failed results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When the document was fetched.
    pub crawled_at: DateTime<Utc>,
    /// Fetch duration in milliseconds.
    #[serde(default)]
    pub duration_ms: f64,
    /// Open-ended metadata (author, hint, cache markers, ...).
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl FetchResult {
    /// Creates an empty successful result for `url`.
    #[must_use]
    pub fn new(url: impl Into<String>, strategy: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: String::new(),
            raw_body: String::new(),
            reduced_body: String::new(),
            html: None,
            screenshot: None,
            links: Vec::new(),
            strategy: strategy.into(),
            status: FetchStatus::Success,
            error: None,
            crawled_at: Utc::now(),
            duration_ms: 0.0,
            metadata: HashMap::new(),
        }
    }

    /// Creates a failed result carrying `error`.
    #[must_use]
    pub fn failed(url: impl Into<String>, strategy: impl Into<String>, error: impl Into<String>) -> Self {
        Self::new(url, strategy)
            .with_status(FetchStatus::Failed)
            .with_error(error)
    }

    /// Sets the title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Sets the full markdown body.
    #[must_use]
    pub fn with_raw_body(mut self, body: impl Into<String>) -> Self {
        self.raw_body = body.into();
        self
    }

    /// Sets the reduced markdown body.
    #[must_use]
    pub fn with_reduced_body(mut self, body: impl Into<String>) -> Self {
        self.reduced_body = body.into();
        self
    }

    /// Sets the raw markup.
    #[must_use]
    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }

    /// Sets the screenshot bytes.
    #[must_use]
    pub fn with_screenshot(mut self, png: Vec<u8>) -> Self {
        self.screenshot = Some(png);
        self
    }

    /// Sets the discovered links.
    #[must_use]
    pub fn with_links(mut self, links: Vec<String>) -> Self {
        self.links = links;
        self
    }

    /// Sets the status.
    #[must_use]
    pub fn with_status(mut self, status: FetchStatus) -> Self {
        self.status = status;
        self
    }

    /// Sets the error text.
    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Sets the fetch timestamp.
    #[must_use]
    pub fn with_crawled_at(mut self, at: DateTime<Utc>) -> Self {
        self.crawled_at = at;
        self
    }

    /// Sets the duration.
    #[must_use]
    pub fn with_duration_ms(mut self, ms: f64) -> Self {
        self.duration_ms = ms;
        self
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Host of the address, lowercased, with one leading `www.` removed.
    ///
    /// An explicit port is kept. Unparseable addresses yield an empty string.
    #[must_use]
    pub fn domain(&self) -> String {
        domain_of(&self.url)
    }

    /// The reduced body when non-empty, otherwise the raw body.
    #[must_use]
    pub fn preferred_body(&self) -> &str {
        if self.reduced_body.is_empty() {
            &self.raw_body
        } else {
            &self.reduced_body
        }
    }

    /// First 16 hex chars of SHA-256 over the preferred body.
    ///
    /// Empty when both bodies are empty.
    #[must_use]
    pub fn content_fingerprint(&self) -> String {
        fingerprint(self.preferred_body())
    }

    /// Character count of the preferred body.
    #[must_use]
    pub fn char_count(&self) -> usize {
        self.preferred_body().chars().count()
    }

    /// Returns true when the result carries no usable content.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.status.is_failure()
    }

    /// Converts to a dictionary representation.
    ///
    /// Bodies and markup are left out; the screenshot is reported by size.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("url".to_string(), serde_json::json!(self.url));
        map.insert("domain".to_string(), serde_json::json!(self.domain()));
        map.insert("title".to_string(), serde_json::json!(self.title));
        map.insert("strategy".to_string(), serde_json::json!(self.strategy));
        map.insert("status".to_string(), serde_json::json!(self.status.as_str()));
        map.insert("char_count".to_string(), serde_json::json!(self.char_count()));
        map.insert(
            "content_hash".to_string(),
            serde_json::json!(self.content_fingerprint()),
        );
        map.insert("links".to_string(), serde_json::json!(self.links.len()));
        map.insert("duration_ms".to_string(), serde_json::json!(self.duration_ms));
        map.insert(
            "crawled_at".to_string(),
            serde_json::json!(self.crawled_at.to_rfc3339()),
        );
        if let Some(ref error) = self.error {
            map.insert("error".to_string(), serde_json::json!(error));
        }
        if let Some(ref png) = self.screenshot {
            map.insert("screenshot_bytes".to_string(), serde_json::json!(png.len()));
        }
        if !self.metadata.is_empty() {
            map.insert("metadata".to_string(), serde_json::json!(self.metadata));
        }
        map
    }

    /// Screenshot encoded as standard base64.
    #[must_use]
    pub fn screenshot_base64(&self) -> Option<String> {
        self.screenshot
            .as_ref()
            .map(|png| base64::engine::general_purpose::STANDARD.encode(png))
    }
}

/// Domain rule shared by results, the router and the store.
#[must_use]
pub fn domain_of(address: &str) -> String {
    let Ok(parsed) = url::Url::parse(address) else {
        return String::new();
    };
    let Some(host) = parsed.host_str() else {
        return String::new();
    };
    let host = host.to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    match parsed.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}

/// Truncated SHA-256 hex digest of `body`; empty input yields an empty string.
#[must_use]
pub fn fingerprint(body: &str) -> String {
    if body.is_empty() {
        return String::new();
    }
    let digest = Sha256::digest(body.as_bytes());
    let mut hex = hex::encode(digest);
    hex.truncate(FINGERPRINT_LEN);
    hex
}
