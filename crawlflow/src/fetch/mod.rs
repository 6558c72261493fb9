//! Fetch strategies.
//!
//! A strategy turns an address plus a [`FetchRequestConfig`] into a
//! [`FetchResult`]. Two interchangeable implementations exist: a plain
//! HTTP fetch for static pages and a full-render fetch backed by a
//! headless-browser service.

mod config;
#[cfg(feature = "fetchers")]
mod http;
#[cfg(feature = "fetchers")]
mod render;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::FetchResult;
use crate::errors::CrawlflowError;

pub use config::{seconds_to_duration, FetchRequestConfig, WAIT_FOR_KEY};
#[cfg(feature = "fetchers")]
pub use http::HttpStrategy;
#[cfg(feature = "fetchers")]
pub use render::RenderStrategy;

/// Which family of strategy the router selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Full browser render.
    Render,
    /// Lightweight HTTP fetch.
    Static,
}

impl Default for StrategyKind {
    fn default() -> Self {
        Self::Render
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Render => write!(f, "render"),
            Self::Static => write!(f, "static"),
        }
    }
}

/// Protocol for page-fetching backends.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FetchStrategy: Send + Sync {
    /// Name recorded on produced results.
    fn name(&self) -> &str;

    /// The strategy family.
    fn kind(&self) -> StrategyKind;

    /// Fetches `url`.
    ///
    /// Transport problems come back as `Err`; the driver turns them into a
    /// failed result.
    async fn fetch(&self, url: &str, config: &FetchRequestConfig) -> Result<FetchResult, CrawlflowError>;

    /// Releases any held resources. Safe to call more than once.
    async fn close(&self) {}
}
