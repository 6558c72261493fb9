//! Process-wide crawler configuration.
//!
//! Values come from serde defaults, optionally overridden by `CRAWLFLOW_*`
//! environment variables (a `.env` file is honored when present).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

use crate::errors::CrawlflowError;
use crate::fetch::FetchRequestConfig;

/// Prefix applied to every environment override.
pub const ENV_PREFIX: &str = "CRAWLFLOW_";

/// Top-level configuration for a [`Crawler`](crate::pipeline::Crawler).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// Proxy address used when `use_proxy` is set.
    #[serde(default = "default_proxy")]
    pub proxy: String,
    /// Whether requests go through `proxy` by default.
    #[serde(default = "default_true")]
    pub use_proxy: bool,
    /// Per-fetch timeout in seconds.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: f64,
    /// Anti-detection mode for the render strategy.
    #[serde(default = "default_true")]
    pub stealth: bool,
    /// Run the rendering browser headless.
    #[serde(default = "default_true")]
    pub headless: bool,
    /// Root directory for the database and page bodies.
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,
    /// File name of the SQLite database inside `storage_dir`.
    #[serde(default = "default_db_name")]
    pub db_name: String,
    /// Upper bound on in-flight fetches in a batch.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Verbose logging.
    #[serde(default)]
    pub verbose: bool,
    /// How old a cached row may be before it is ignored.
    #[serde(default = "default_cache_max_age_seconds")]
    pub cache_max_age_seconds: i64,
    /// Base address of the rendering service.
    #[serde(default = "default_render_endpoint")]
    pub render_endpoint: String,
    /// Retry low-yield static fetches once with the render strategy.
    #[serde(default = "default_true")]
    pub fallback_to_render: bool,
}

fn default_proxy() -> String {
    "http://127.0.0.1:7897".to_string()
}

fn default_true() -> bool {
    true
}

fn default_timeout_seconds() -> f64 {
    30.0
}

fn default_storage_dir() -> PathBuf {
    PathBuf::from("storage")
}

fn default_db_name() -> String {
    "crawlflow.db".to_string()
}

fn default_max_concurrency() -> usize {
    5
}

fn default_cache_max_age_seconds() -> i64 {
    3600
}

fn default_render_endpoint() -> String {
    "http://127.0.0.1:11235".to_string()
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            proxy: default_proxy(),
            use_proxy: true,
            timeout_seconds: default_timeout_seconds(),
            stealth: true,
            headless: true,
            storage_dir: default_storage_dir(),
            db_name: default_db_name(),
            max_concurrency: default_max_concurrency(),
            verbose: false,
            cache_max_age_seconds: default_cache_max_age_seconds(),
            render_endpoint: default_render_endpoint(),
            fallback_to_render: true,
        }
    }
}

impl CrawlConfig {
    /// Loads configuration from the process environment.
    ///
    /// A `.env` file in the working directory is read first if it exists.
    pub fn from_env() -> Result<Self, CrawlflowError> {
        // A missing .env file is normal.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary key lookup.
    ///
    /// Keys are the field names upper-cased with the `CRAWLFLOW_` prefix.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CrawlflowError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));
        let mut config = Self::default();

        if let Some(v) = get("PROXY") {
            config.proxy = v;
        }
        if let Some(v) = get("USE_PROXY") {
            config.use_proxy = parse_bool("USE_PROXY", &v)?;
        }
        if let Some(v) = get("TIMEOUT") {
            config.timeout_seconds = parse_value("TIMEOUT", &v)?;
        }
        if let Some(v) = get("STEALTH") {
            config.stealth = parse_bool("STEALTH", &v)?;
        }
        if let Some(v) = get("HEADLESS") {
            config.headless = parse_bool("HEADLESS", &v)?;
        }
        if let Some(v) = get("STORAGE_DIR") {
            config.storage_dir = PathBuf::from(v);
        }
        if let Some(v) = get("DB_NAME") {
            config.db_name = v;
        }
        if let Some(v) = get("MAX_CONCURRENCY") {
            config.max_concurrency = parse_value("MAX_CONCURRENCY", &v)?;
        }
        if let Some(v) = get("VERBOSE") {
            config.verbose = parse_bool("VERBOSE", &v)?;
        }
        if let Some(v) = get("CACHE_MAX_AGE") {
            config.cache_max_age_seconds = parse_value("CACHE_MAX_AGE", &v)?;
        }
        if let Some(v) = get("RENDER_ENDPOINT") {
            config.render_endpoint = v;
        }
        if let Some(v) = get("FALLBACK_TO_RENDER") {
            config.fallback_to_render = parse_bool("FALLBACK_TO_RENDER", &v)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<(), CrawlflowError> {
        if self.max_concurrency == 0 {
            return Err(CrawlflowError::config("max_concurrency must be at least 1"));
        }
        if !(self.timeout_seconds.is_finite() && self.timeout_seconds > 0.0) {
            return Err(CrawlflowError::config("timeout must be a positive number"));
        }
        crate::fetch::seconds_to_duration("timeout", self.timeout_seconds)?;
        if self.cache_max_age_seconds < 0 {
            return Err(CrawlflowError::config("cache max age cannot be negative"));
        }
        Ok(())
    }

    /// Path of the SQLite database.
    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.storage_dir.join(&self.db_name)
    }

    /// Directory holding page bodies.
    #[must_use]
    pub fn pages_dir(&self) -> PathBuf {
        self.storage_dir.join("pages")
    }

    /// The fetch configuration applied when a caller supplies none.
    #[must_use]
    pub fn default_fetch_config(&self) -> FetchRequestConfig {
        let proxy = self.use_proxy.then(|| self.proxy.clone());
        FetchRequestConfig::default()
            .with_proxy(proxy)
            .with_timeout(self.timeout_seconds)
            .with_stealth(self.stealth)
            .with_headless(self.headless)
            .with_verbose(self.verbose)
    }

    /// Sets the storage directory.
    #[must_use]
    pub fn with_storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage_dir = dir.into();
        self
    }

    /// Sets the batch concurrency bound.
    #[must_use]
    pub fn with_max_concurrency(mut self, n: usize) -> Self {
        self.max_concurrency = n;
        self
    }

    /// Disables the default proxy.
    #[must_use]
    pub fn without_proxy(mut self) -> Self {
        self.use_proxy = false;
        self
    }

    /// Sets the per-fetch timeout.
    #[must_use]
    pub fn with_timeout(mut self, seconds: f64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Sets the rendering service address.
    #[must_use]
    pub fn with_render_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.render_endpoint = endpoint.into();
        self
    }

    /// Enables or disables the render fallback.
    #[must_use]
    pub fn with_fallback_to_render(mut self, enabled: bool) -> Self {
        self.fallback_to_render = enabled;
        self
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool, CrawlflowError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(CrawlflowError::config(format!(
            "{ENV_PREFIX}{name}: expected a boolean, got {other:?}"
        ))),
    }
}

fn parse_value<T: FromStr>(name: &str, value: &str) -> Result<T, CrawlflowError> {
    value.trim().parse().map_err(|_| {
        CrawlflowError::config(format!("{ENV_PREFIX}{name}: invalid value {value:?}"))
    })
}
