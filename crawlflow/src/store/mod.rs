//! Content-addressed crawl cache backed by SQLite and a markdown file tree.
//!
//! Rows are append-only. A `UNIQUE(url, content_hash)` constraint makes
//! re-saving identical content for the same address a no-op, even under
//! concurrent writers.

mod records;

use chrono::Duration;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::config::CrawlConfig;
use crate::core::{FetchResult, FetchStatus};
use crate::errors::CrawlflowError;
use crate::utils::{format_storage, now_utc};

pub use records::CachedRecord;
use records::CrawlRow;

/// Directory under the storage root holding page bodies.
pub const PAGES_DIR: &str = "pages";

const SELECT_COLUMNS: &str = "SELECT id, url, domain, title, strategy, status, content_hash, \
                              file_path, char_count, crawled_at, error FROM crawls";

/// SQLite-backed crawl store.
#[derive(Debug, Clone)]
pub struct CrawlStore {
    pool: SqlitePool,
    root: PathBuf,
}

impl CrawlStore {
    /// Opens (creating if needed) the store described by `config`.
    pub async fn from_config(config: &CrawlConfig) -> Result<Self, CrawlflowError> {
        Self::open(&config.storage_dir, &config.db_name).await
    }

    /// Opens (creating if needed) `root/db_name` and the page tree under `root`.
    pub async fn open(root: impl AsRef<Path>, db_name: &str) -> Result<Self, CrawlflowError> {
        let root = root.as_ref().to_path_buf();
        tokio::fs::create_dir_all(root.join(PAGES_DIR)).await?;

        let options = SqliteConnectOptions::new()
            .filename(root.join(db_name))
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self { pool, root };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), CrawlflowError> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS crawls (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                url TEXT NOT NULL,
                domain TEXT NOT NULL,
                title TEXT NOT NULL DEFAULT '',
                strategy TEXT NOT NULL,
                status TEXT NOT NULL,
                content_hash TEXT NOT NULL,
                file_path TEXT,
                char_count INTEGER NOT NULL DEFAULT 0,
                crawled_at TEXT NOT NULL,
                error TEXT,
                UNIQUE (url, content_hash)
            );

            CREATE INDEX IF NOT EXISTS idx_crawls_url ON crawls(url);
            CREATE INDEX IF NOT EXISTS idx_crawls_domain ON crawls(domain);
            CREATE INDEX IF NOT EXISTS idx_crawls_crawled_at ON crawls(crawled_at);
            ",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Storage root; body paths in rows are relative to it.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persists `result`.
    ///
    /// Returns the new row id, or 0 when the same address already has a row
    /// with the same fingerprint. A non-empty preferred body is written to its
    /// content-addressed file before the row is inserted, so a row never
    /// points at a body that failed to write, and re-saving the same content
    /// restores a file that went missing.
    pub async fn save(&self, result: &FetchResult) -> Result<i64, CrawlflowError> {
        let fingerprint = result.content_fingerprint();
        let domain = result.domain();
        let body = result.preferred_body();
        let file_path = (!body.is_empty()).then(|| page_path(&domain, &fingerprint));
        let char_count = i64::try_from(result.char_count()).unwrap_or(i64::MAX);

        if let Some(ref relative) = file_path {
            let path = self.root.join(relative);
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&path, body).await?;
        }

        let outcome = sqlx::query(
            r"
            INSERT OR IGNORE INTO crawls
                (url, domain, title, strategy, status, content_hash, file_path, char_count, crawled_at, error)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(&result.url)
        .bind(&domain)
        .bind(&result.title)
        .bind(&result.strategy)
        .bind(result.status.as_str())
        .bind(&fingerprint)
        .bind(file_path.as_deref())
        .bind(char_count)
        .bind(format_storage(&result.crawled_at))
        .bind(result.error.as_deref())
        .execute(&self.pool)
        .await?;

        if outcome.rows_affected() == 0 {
            debug!(url = %result.url, content_hash = %fingerprint, "Duplicate content; save skipped");
            return Ok(0);
        }
        let id = outcome.last_insert_rowid();

        debug!(url = %result.url, id, "Crawl saved");
        Ok(id)
    }

    /// Newest usable row for `url` no older than `max_age_seconds`.
    ///
    /// Failed rows and rows recorded as cache replays are never returned.
    pub async fn get_cached(&self, url: &str, max_age_seconds: i64) -> Result<Option<CachedRecord>, CrawlflowError> {
        // An age too large to represent means no lower bound; "" sorts first.
        let cutoff = Duration::try_seconds(max_age_seconds)
            .and_then(|age| now_utc().checked_sub_signed(age))
            .map_or_else(String::new, |at| format_storage(&at));
        let row: Option<CrawlRow> = sqlx::query_as(&format!(
            "{SELECT_COLUMNS} WHERE url = ? AND status NOT IN (?, ?) AND crawled_at >= ? \
             ORDER BY crawled_at DESC, id DESC LIMIT 1"
        ))
        .bind(url)
        .bind(FetchStatus::Failed.as_str())
        .bind(FetchStatus::Cached.as_str())
        .bind(cutoff)
        .fetch_optional(&self.pool)
        .await?;
        row.map(CrawlRow::into_record).transpose()
    }

    /// All rows for `url`, newest first.
    pub async fn get_by_url(&self, url: &str) -> Result<Vec<CachedRecord>, CrawlflowError> {
        let rows: Vec<CrawlRow> = sqlx::query_as(&format!(
            "{SELECT_COLUMNS} WHERE url = ? ORDER BY crawled_at DESC, id DESC"
        ))
        .bind(url)
        .fetch_all(&self.pool)
        .await?;
        into_records(rows)
    }

    /// Rows for `domain`, newest first.
    pub async fn get_by_domain(&self, domain: &str, limit: i64) -> Result<Vec<CachedRecord>, CrawlflowError> {
        let rows: Vec<CrawlRow> = sqlx::query_as(&format!(
            "{SELECT_COLUMNS} WHERE domain = ? ORDER BY crawled_at DESC, id DESC LIMIT ?"
        ))
        .bind(domain.to_ascii_lowercase())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        into_records(rows)
    }

    /// Rows whose title or address contains `keyword` (case-insensitive), newest first.
    pub async fn search(&self, keyword: &str, limit: i64) -> Result<Vec<CachedRecord>, CrawlflowError> {
        let pattern = format!("%{}%", escape_like(keyword));
        let rows: Vec<CrawlRow> = sqlx::query_as(&format!(
            "{SELECT_COLUMNS} WHERE title LIKE ?1 ESCAPE '\\' OR url LIKE ?1 ESCAPE '\\' \
             ORDER BY crawled_at DESC, id DESC LIMIT ?2"
        ))
        .bind(pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        into_records(rows)
    }

    /// Most recent rows.
    pub async fn recent(&self, limit: i64) -> Result<Vec<CachedRecord>, CrawlflowError> {
        let rows: Vec<CrawlRow> = sqlx::query_as(&format!(
            "{SELECT_COLUMNS} ORDER BY crawled_at DESC, id DESC LIMIT ?"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        into_records(rows)
    }

    /// Total number of rows.
    pub async fn count(&self) -> Result<i64, CrawlflowError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM crawls")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Body text for `record`; empty when it has no file or the file is gone.
    pub async fn read_body(&self, record: &CachedRecord) -> String {
        let Some(ref relative) = record.file_path else {
            return String::new();
        };
        let path = self.root.join(relative);
        match tokio::fs::read_to_string(&path).await {
            Ok(body) => body,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Cached body missing; using empty body");
                String::new()
            }
        }
    }

    /// Closes the connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn into_records(rows: Vec<CrawlRow>) -> Result<Vec<CachedRecord>, CrawlflowError> {
    rows.into_iter().map(CrawlRow::into_record).collect()
}

/// Relative body path for a domain and fingerprint.
fn page_path(domain: &str, fingerprint: &str) -> String {
    let dir: String = if domain.is_empty() {
        "_unknown".to_string()
    } else {
        domain
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
            .collect()
    };
    format!("{PAGES_DIR}/{dir}/{fingerprint}.md")
}

fn escape_like(keyword: &str) -> String {
    let mut out = String::with_capacity(keyword.len());
    for c in keyword.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
