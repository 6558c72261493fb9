//! Configuration for the readability extractor.

use serde::{Deserialize, Serialize};

/// Selector lists driving main-content extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Elements removed before anything else.
    #[serde(default = "default_remove_selectors")]
    pub remove_selectors: Vec<String>,
    /// Candidate main-content containers, in priority order.
    #[serde(default = "default_content_selectors")]
    pub main_content_selectors: Vec<String>,
    /// Minimum text length for a container to be accepted.
    #[serde(default = "default_min_text")]
    pub min_text_length: usize,
}

fn default_remove_selectors() -> Vec<String> {
    [
        "script",
        "style",
        "noscript",
        "iframe",
        "svg",
        "form",
        "nav",
        "footer",
        "header",
        "aside",
        "[role='navigation']",
        "[role='banner']",
        "[role='contentinfo']",
        "[role='complementary']",
        ".ad",
        ".ads",
        ".advertisement",
        ".sidebar",
        ".cookie-banner",
        ".cookie-notice",
        "#cookie-banner",
        ".share-buttons",
        ".social-share",
        ".related-articles",
        ".newsletter-signup",
    ]
    .iter()
    .map(|s| (*s).to_string())
    .collect()
}

fn default_content_selectors() -> Vec<String> {
    [
        "article",
        "main",
        "[role=\"main\"]",
        "#content",
        ".content",
        ".post-content",
        ".article-content",
        ".article-body",
        ".entry-content",
    ]
    .iter()
    .map(|s| (*s).to_string())
    .collect()
}

fn default_min_text() -> usize {
    40
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            remove_selectors: default_remove_selectors(),
            main_content_selectors: default_content_selectors(),
            min_text_length: default_min_text(),
        }
    }
}

impl ExtractionConfig {
    /// Appends a removal selector.
    #[must_use]
    pub fn with_remove_selector(mut self, selector: impl Into<String>) -> Self {
        self.remove_selectors.push(selector.into());
        self
    }

    /// Replaces the main-content selectors.
    #[must_use]
    pub fn with_content_selectors(mut self, selectors: Vec<String>) -> Self {
        self.main_content_selectors = selectors;
        self
    }
}
