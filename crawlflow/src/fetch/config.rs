//! Per-request fetch configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::errors::CrawlflowError;

/// Key under `extra` holding a selector to wait for before capture.
pub const WAIT_FOR_KEY: &str = "wait_for";

/// Options for a single fetch.
///
/// Treated as a value: every `with_*` consumes `self` and returns the
/// updated copy, so a caller's instance is never changed behind its back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchRequestConfig {
    /// Proxy address, if any.
    #[serde(default)]
    pub proxy: Option<String>,
    /// Timeout in seconds.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: f64,
    /// Anti-detection mode.
    #[serde(default = "default_true")]
    pub stealth: bool,
    /// Headless browser.
    #[serde(default = "default_true")]
    pub headless: bool,
    /// Extra seconds to wait after load.
    #[serde(default)]
    pub wait_seconds: f64,
    /// Scroll the page to trigger lazy content.
    #[serde(default)]
    pub scroll: bool,
    /// CSS selector restricting the captured region.
    #[serde(default)]
    pub selector: Option<String>,
    /// Script injected into the page before capture.
    #[serde(default)]
    pub js_code: Option<String>,
    /// Cookie file (JSON list of cookies).
    #[serde(default)]
    pub cookie_file: Option<PathBuf>,
    /// Capture a screenshot.
    #[serde(default)]
    pub screenshot: bool,
    /// Verbose strategy logging.
    #[serde(default)]
    pub verbose: bool,
    /// Strategy-specific extensions.
    #[serde(default)]
    pub extra: HashMap<String, serde_json::Value>,
}

fn default_timeout_seconds() -> f64 {
    30.0
}

fn default_true() -> bool {
    true
}

impl Default for FetchRequestConfig {
    fn default() -> Self {
        Self {
            proxy: None,
            timeout_seconds: default_timeout_seconds(),
            stealth: true,
            headless: true,
            wait_seconds: 0.0,
            scroll: false,
            selector: None,
            js_code: None,
            cookie_file: None,
            screenshot: false,
            verbose: false,
            extra: HashMap::new(),
        }
    }
}

impl FetchRequestConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets or clears the proxy.
    #[must_use]
    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy = proxy;
        self
    }

    /// Sets the timeout.
    #[must_use]
    pub fn with_timeout(mut self, seconds: f64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Sets stealth mode.
    #[must_use]
    pub fn with_stealth(mut self, stealth: bool) -> Self {
        self.stealth = stealth;
        self
    }

    /// Sets headless mode.
    #[must_use]
    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Sets the extra wait.
    #[must_use]
    pub fn with_wait(mut self, seconds: f64) -> Self {
        self.wait_seconds = seconds;
        self
    }

    /// Sets auto-scroll.
    #[must_use]
    pub fn with_scroll(mut self, scroll: bool) -> Self {
        self.scroll = scroll;
        self
    }

    /// Sets the CSS selector.
    #[must_use]
    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    /// Sets the injected script.
    #[must_use]
    pub fn with_js_code(mut self, js: impl Into<String>) -> Self {
        self.js_code = Some(js.into());
        self
    }

    /// Sets the cookie file.
    #[must_use]
    pub fn with_cookie_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.cookie_file = Some(path.into());
        self
    }

    /// Requests a screenshot.
    #[must_use]
    pub fn with_screenshot(mut self, screenshot: bool) -> Self {
        self.screenshot = screenshot;
        self
    }

    /// Sets verbosity.
    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Adds an extension entry.
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// The wait-for selector, if one was set.
    #[must_use]
    pub fn wait_for(&self) -> Option<&str> {
        self.extra.get(WAIT_FOR_KEY).and_then(serde_json::Value::as_str)
    }

    /// The request timeout as a [`Duration`].
    pub fn timeout(&self) -> Result<Duration, CrawlflowError> {
        seconds_to_duration("timeout", self.timeout_seconds)
    }

    /// Wall-clock budget for a whole fetch: timeout plus wait plus `grace_seconds`.
    ///
    /// Fails when the timeout or wait is negative or not finite, or when the
    /// sum does not fit in a [`Duration`].
    pub fn budget(&self, grace_seconds: f64) -> Result<Duration, CrawlflowError> {
        self.timeout()?;
        seconds_to_duration("wait", self.wait_seconds)?;
        seconds_to_duration(
            "fetch budget",
            self.timeout_seconds + self.wait_seconds + grace_seconds,
        )
    }
}

/// Converts caller-supplied seconds, rejecting negative, non-finite and
/// out-of-range values.
pub fn seconds_to_duration(label: &str, seconds: f64) -> Result<Duration, CrawlflowError> {
    Duration::try_from_secs_f64(seconds)
        .map_err(|e| CrawlflowError::config(format!("invalid {label} of {seconds:?} seconds: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = FetchRequestConfig::default();
        assert!(cfg.proxy.is_none());
        assert_eq!(cfg.timeout_seconds, 30.0);
        assert!(cfg.stealth);
        assert!(cfg.headless);
        assert_eq!(cfg.wait_seconds, 0.0);
        assert!(!cfg.scroll);
        assert!(cfg.extra.is_empty());
    }

    #[test]
    fn test_builders_leave_original_untouched() {
        let base = FetchRequestConfig::default();
        let modified = base.clone().with_wait(3.0).with_selector("article");
        assert_eq!(base.wait_seconds, 0.0);
        assert!(base.selector.is_none());
        assert_eq!(modified.wait_seconds, 3.0);
        assert_eq!(modified.selector.as_deref(), Some("article"));
    }

    #[test]
    fn test_wait_for() {
        let cfg = FetchRequestConfig::default().with_extra(WAIT_FOR_KEY, serde_json::json!("#main"));
        assert_eq!(cfg.wait_for(), Some("#main"));
    }

    #[test]
    fn test_budget_sums_timeout_wait_and_grace() {
        let cfg = FetchRequestConfig::default().with_timeout(10.0).with_wait(2.5);
        assert_eq!(cfg.budget(30.0).unwrap(), Duration::from_secs_f64(42.5));
        assert_eq!(cfg.timeout().unwrap(), Duration::from_secs(10));
    }

    #[test]
    fn test_budget_rejects_out_of_range_seconds() {
        let negative_wait = FetchRequestConfig::default().with_wait(-100.0);
        let err = negative_wait.budget(30.0).unwrap_err();
        assert_eq!(err.kind(), "config");
        assert!(err.to_string().contains("invalid wait"));

        let nan_timeout = FetchRequestConfig::default().with_timeout(f64::NAN);
        assert!(nan_timeout.timeout().is_err());
        assert!(nan_timeout.budget(30.0).is_err());

        let infinite_wait = FetchRequestConfig::default().with_wait(f64::INFINITY);
        assert!(infinite_wait.budget(30.0).is_err());

        let huge = FetchRequestConfig::default().with_timeout(f64::MAX / 2.0).with_wait(f64::MAX / 2.0);
        assert!(huge.budget(30.0).is_err());
    }

    #[test]
    fn test_deserialize_fills_defaults() {
        let cfg: FetchRequestConfig = serde_json::from_str(r#"{"scroll": true}"#).unwrap();
        assert!(cfg.scroll);
        assert!(cfg.stealth);
        assert_eq!(cfg.timeout_seconds, 30.0);
    }
}
