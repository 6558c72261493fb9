//! The crawl pipeline: cache, route, fetch, arbitrate, refine, persist.

mod batch;
mod driver;
mod options;

pub use batch::PIPELINE_STRATEGY;
pub use driver::{
    Crawler, CACHED_AT_KEY, FALLBACK_FROM_KEY, FETCH_GRACE_SECONDS, FROM_CACHE_KEY, RECORD_ID_KEY,
    STORAGE_ERROR_KEY,
};
pub use options::CrawlOptions;
