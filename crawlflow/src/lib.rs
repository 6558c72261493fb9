//! # Crawlflow
//!
//! Crawl orchestration: fetch a page with the right strategy, clean it up
//! with per-site rules, keep the better of two extractions, and cache the
//! result by content.
//!
//! The pipeline for one address:
//!
//! - **Cache**: a fresh, non-failed stored copy short-circuits everything
//! - **Route**: pick a full-render or lightweight strategy and a site policy
//! - **Fetch**: run the strategy under a bounded timeout
//! - **Arbitrate**: score the strategy's reduced body against an
//!   independent extraction and keep the better one
//! - **Refine**: apply the site policy's cleanup and low-yield rule
//! - **Persist**: store the row and body, deduplicated by fingerprint
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use crawlflow::prelude::*;
//!
//! let config = CrawlConfig::from_env()?;
//! let crawler = Crawler::from_config(config);
//! let result = crawler
//!     .crawl("https://example.com/article", &CrawlOptions::new().saving())
//!     .await;
//! println!("{} ({})", result.title, result.status);
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod convert;
pub mod core;
pub mod errors;
pub mod extract;
pub mod fetch;
pub mod observability;
pub mod pipeline;
pub mod policy;
pub mod router;
pub mod store;
pub mod testing;
pub mod tools;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::CrawlConfig;
    pub use crate::core::{FetchResult, FetchStatus};
    pub use crate::errors::{CrawlflowError, ToolError};
    pub use crate::extract::{ContentExtractor, QualityArbiter, ReadabilityExtractor};
    pub use crate::fetch::{FetchRequestConfig, FetchStrategy, StrategyKind};
    #[cfg(feature = "fetchers")]
    pub use crate::fetch::{HttpStrategy, RenderStrategy};
    pub use crate::observability::{FetchObserver, LoggingFetchObserver, NoOpFetchObserver};
    pub use crate::pipeline::{CrawlOptions, Crawler};
    pub use crate::policy::{ContentPolicy, PolicyRegistry};
    pub use crate::router::{Route, Router};
    pub use crate::store::{CachedRecord, CrawlStore};
    pub use crate::tools::{OutputFormat, ToolExecutor, ToolInput, ToolOutput};
}
