//! Row types for the crawl store.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::core::FetchStatus;
use crate::errors::CrawlflowError;
use crate::utils::{parse_storage, Timestamp};

/// One persisted crawl. The body lives in the file tree, not in the row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedRecord {
    /// Row id.
    pub id: i64,
    /// Requested address.
    pub url: String,
    /// Normalized domain.
    pub domain: String,
    /// Title at crawl time.
    pub title: String,
    /// Strategy that produced the content.
    pub strategy: String,
    /// Status at crawl time.
    pub status: FetchStatus,
    /// Content fingerprint.
    pub content_hash: String,
    /// Body path relative to the storage root.
    pub file_path: Option<String>,
    /// Length of the stored body in characters.
    pub char_count: i64,
    /// When the page was fetched.
    pub crawled_at: Timestamp,
    /// Error text for failed crawls.
    pub error: Option<String>,
}

impl CachedRecord {
    /// Summary used by the query tool and the CLI.
    #[must_use]
    pub fn summary(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "url": self.url,
            "title": self.title,
            "domain": self.domain,
            "strategy": self.strategy,
            "status": self.status.as_str(),
            "char_count": self.char_count,
            "crawled_at": self.crawled_at.to_rfc3339(),
        })
    }
}

/// Raw row as stored in SQLite.
#[derive(Debug, FromRow)]
pub(super) struct CrawlRow {
    pub id: i64,
    pub url: String,
    pub domain: String,
    pub title: String,
    pub strategy: String,
    pub status: String,
    pub content_hash: String,
    pub file_path: Option<String>,
    pub char_count: i64,
    pub crawled_at: String,
    pub error: Option<String>,
}

impl CrawlRow {
    pub(super) fn into_record(self) -> Result<CachedRecord, CrawlflowError> {
        let status = self.status.parse::<FetchStatus>().map_err(CrawlflowError::storage)?;
        let crawled_at = parse_storage(&self.crawled_at)
            .map_err(|e| CrawlflowError::storage(format!("row {}: {e}", self.id)))?;
        Ok(CachedRecord {
            id: self.id,
            url: self.url,
            domain: self.domain,
            title: self.title,
            strategy: self.strategy,
            status,
            content_hash: self.content_hash,
            file_path: self.file_path,
            char_count: self.char_count,
            crawled_at,
            error: self.error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(status: &str, crawled_at: &str) -> CrawlRow {
        CrawlRow {
            id: 7,
            url: "https://a.com/x".to_string(),
            domain: "a.com".to_string(),
            title: "A".to_string(),
            strategy: "http".to_string(),
            status: status.to_string(),
            content_hash: "abc".to_string(),
            file_path: Some("pages/a.com/abc.md".to_string()),
            char_count: 3,
            crawled_at: crawled_at.to_string(),
            error: None,
        }
    }

    #[test]
    fn test_into_record() {
        let record = row("partial", "2026-01-01T00:00:00.000000Z").into_record().unwrap();
        assert_eq!(record.status, FetchStatus::Partial);
        assert_eq!(record.summary()["status"], "partial");
        assert_eq!(record.summary()["url"], "https://a.com/x");
    }

    #[test]
    fn test_into_record_rejects_bad_rows() {
        assert!(row("weird", "2026-01-01T00:00:00.000000Z").into_record().is_err());
        assert!(row("success", "not a time").into_record().is_err());
    }
}
