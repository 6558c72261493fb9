//! Content quality scoring.
//!
//! The score rewards length up to a ceiling, penalizes link-list shaped
//! text, and rewards prose paragraphs. It only has to rank two candidate
//! bodies for the same page against each other.

use regex::Regex;
use std::sync::LazyLock;

/// Texts shorter than this get the flat [`SHORT_TEXT_SCORE`].
pub const MIN_SCORED_CHARS: usize = 100;
/// Score for non-empty text under [`MIN_SCORED_CHARS`].
pub const SHORT_TEXT_SCORE: f64 = 0.1;
/// Length at which the length component saturates.
pub const LENGTH_CEILING: f64 = 2000.0;
/// Paragraph count at which the structure component saturates.
pub const PARAGRAPH_CEILING: f64 = 3.0;
/// Minimum trimmed length of a block to count as a paragraph.
pub const MIN_PARAGRAPH_CHARS: usize = 50;

#[allow(clippy::expect_used)]
static MARKDOWN_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]*)\]\([^)]+\)").expect("link pattern is valid"));

/// Share of characters that belong to markdown link labels.
#[must_use]
pub fn link_density(text: &str) -> f64 {
    let total = text.chars().count();
    if total == 0 {
        return 0.0;
    }
    let label_chars: usize = MARKDOWN_LINK
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().chars().count())
        .sum();
    label_chars as f64 / total as f64
}

/// Number of blank-line separated blocks longer than [`MIN_PARAGRAPH_CHARS`].
#[must_use]
pub fn paragraph_count(text: &str) -> usize {
    text.split("\n\n")
        .filter(|block| block.trim().chars().count() > MIN_PARAGRAPH_CHARS)
        .count()
}

/// Quality score in `[0, 1]`, rounded to three decimals.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn quality_score(text: &str) -> f64 {
    if text.is_empty() {
        return 0.0;
    }
    let length = text.chars().count();
    if length < MIN_SCORED_CHARS {
        return SHORT_TEXT_SCORE;
    }

    let length_part = (length as f64 / LENGTH_CEILING).min(1.0) * 0.3;
    let link_part = (1.0 - link_density(text)) * 0.4;
    let paragraph_part = (paragraph_count(text) as f64 / PARAGRAPH_CEILING).min(1.0) * 0.3;

    ((length_part + link_part + paragraph_part) * 1000.0).round() / 1000.0
}
