//! Fetch status enum.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Outcome of a fetch as recorded on a [`FetchResult`](super::FetchResult).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStatus {
    /// Content was retrieved normally.
    Success,
    /// Content was retrieved but is known to be incomplete.
    Partial,
    /// Content was served from the local store.
    Cached,
    /// No usable content was retrieved.
    Failed,
}

impl Default for FetchStatus {
    fn default() -> Self {
        Self::Success
    }
}

impl fmt::Display for FetchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FetchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(Self::Success),
            "partial" => Ok(Self::Partial),
            "cached" => Ok(Self::Cached),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown fetch status: {other}")),
        }
    }
}

impl FetchStatus {
    /// The lowercase name stored in the database.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Partial => "partial",
            Self::Cached => "cached",
            Self::Failed => "failed",
        }
    }

    /// Returns true if the result carries usable content.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        !matches!(self, Self::Failed)
    }

    /// Returns true if the status indicates failure.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed)
    }
}
