//! Quality arbitration between a strategy's reduced body and an
//! independent extraction pass.

mod config;
mod quality;
mod readability;

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::core::FetchResult;
use crate::errors::CrawlflowError;

pub use config::ExtractionConfig;
pub use quality::{link_density, paragraph_count, quality_score};
pub use readability::ReadabilityExtractor;

/// Metadata key recording the score of the kept reduced body.
pub const QUALITY_SCORE_KEY: &str = "quality_score";

/// Output of an independent extraction pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    /// Candidate reduced body (markdown).
    pub body: String,
    /// Candidate title.
    pub title: Option<String>,
    /// Candidate metadata (author, date, sitename, categories, tags).
    pub metadata: HashMap<String, serde_json::Value>,
}

/// Protocol for independent content extraction from raw markup.
#[cfg_attr(test, mockall::automock)]
pub trait ContentExtractor: Send + Sync {
    /// Extracts a candidate body and metadata from `html`.
    fn extract(&self, html: &str) -> Result<Extraction, CrawlflowError>;
}

/// Keeps the better of two reduced bodies and backfills metadata.
#[derive(Clone)]
pub struct QualityArbiter {
    extractor: Arc<dyn ContentExtractor>,
}

impl std::fmt::Debug for QualityArbiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QualityArbiter").finish_non_exhaustive()
    }
}

impl Default for QualityArbiter {
    fn default() -> Self {
        Self::new(Arc::new(ReadabilityExtractor::default()))
    }
}

impl QualityArbiter {
    /// Creates an arbiter around `extractor`.
    #[must_use]
    pub fn new(extractor: Arc<dyn ContentExtractor>) -> Self {
        Self { extractor }
    }

    /// Arbitrates `result`.
    ///
    /// No-op when there is no markup or the fetch failed. Extraction errors
    /// are logged and the input is returned unchanged.
    #[must_use]
    pub fn arbitrate(&self, mut result: FetchResult) -> FetchResult {
        if result.is_failed() {
            return result;
        }
        let extraction = match result.html.as_deref() {
            Some(html) if !html.is_empty() => self.extractor.extract(html),
            _ => return result,
        };
        let extraction = match extraction {
            Ok(extraction) => extraction,
            Err(e) => {
                warn!(url = %result.url, error = %e, "Extraction failed; keeping strategy output");
                return result;
            }
        };

        if !extraction.body.is_empty() {
            let candidate = quality_score(&extraction.body);
            let existing = if result.reduced_body.is_empty() {
                0.0
            } else {
                quality_score(&result.reduced_body)
            };
            debug!(url = %result.url, candidate, existing, "Quality arbitration");
            let kept = if candidate >= existing {
                result.reduced_body = extraction.body;
                candidate
            } else {
                existing
            };
            result
                .metadata
                .insert(QUALITY_SCORE_KEY.to_string(), serde_json::json!(kept));
        }

        for (key, value) in extraction.metadata {
            result.metadata.entry(key).or_insert(value);
        }
        if result.title.trim().is_empty() {
            if let Some(title) = extraction.title.filter(|t| !t.trim().is_empty()) {
                result.title = title;
            }
        }
        result
    }
}
