//! Output formats for tool and CLI responses.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::core::FetchResult;
use crate::policy::cleanup::pattern;

static LINK_SYNTAX: LazyLock<Regex> = LazyLock::new(|| pattern(r"!?\[([^\]]*)\]\([^)]+\)"));
static EMPHASIS: LazyLock<Regex> = LazyLock::new(|| pattern(r"[#*_`~]"));

/// Content format requested by a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Full markdown.
    #[default]
    Markdown,
    /// Noise-reduced markdown, falling back to full markdown.
    Fit,
    /// Raw markup.
    Html,
    /// Markdown with link syntax and emphasis characters removed.
    Text,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Markdown => write!(f, "markdown"),
            Self::Fit => write!(f, "fit"),
            Self::Html => write!(f, "html"),
            Self::Text => write!(f, "text"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "markdown" => Ok(Self::Markdown),
            "fit" => Ok(Self::Fit),
            "html" => Ok(Self::Html),
            "text" => Ok(Self::Text),
            other => Err(format!("unknown format: {other}")),
        }
    }
}

impl OutputFormat {
    /// Renders `result` in this format.
    #[must_use]
    pub fn render(self, result: &FetchResult) -> String {
        match self {
            Self::Markdown => result.raw_body.clone(),
            Self::Fit => result.preferred_body().to_string(),
            Self::Html => result.html.clone().unwrap_or_default(),
            Self::Text => strip_markup(&result.raw_body),
        }
    }
}

/// Removes link and image syntax (keeping the label) and emphasis characters.
#[must_use]
pub fn strip_markup(markdown: &str) -> String {
    let unlinked = LINK_SYNTAX.replace_all(markdown, "$1");
    EMPHASIS.replace_all(&unlinked, "").into_owned()
}

/// Cuts `text` to `max_chars` characters and appends a marker.
///
/// `max_chars == 0` means no limit.
#[must_use]
pub fn truncate(text: &str, max_chars: usize) -> String {
    if max_chars == 0 {
        return text.to_string();
    }
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}\n\n... (truncated at {max_chars} chars)", &text[..cut]),
        None => text.to_string(),
    }
}
