//! Observability: pipeline observers and tracing setup.

mod observer;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::errors::CrawlflowError;

pub use observer::{FetchObserver, LoggingFetchObserver, NoOpFetchObserver};

/// Default filter directive when `RUST_LOG` is unset.
#[must_use]
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "crawlflow=debug,info"
    } else {
        "crawlflow=info,warn"
    }
}

/// Installs a global `tracing` subscriber writing to stderr.
///
/// `RUST_LOG` takes precedence over `verbose`. With `json` set, events are
/// emitted as one JSON object per line.
pub fn init_tracing(verbose: bool, json: bool) -> Result<(), CrawlflowError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive(verbose)))
        .map_err(|e| CrawlflowError::config(format!("invalid log filter: {e}")))?;

    let registry = tracing_subscriber::registry().with(filter);
    let installed = if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()
    };
    installed.map_err(|e| CrawlflowError::config(format!("tracing already initialized: {e}")))
}
