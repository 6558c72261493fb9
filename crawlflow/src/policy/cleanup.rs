//! Text cleanup primitives used by site policies.

use regex::Regex;
use std::sync::LazyLock;

#[allow(clippy::expect_used)]
static BLANK_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("blank-run pattern is valid"));

/// Collapses runs of three or more newlines to two and trims the ends.
#[must_use]
pub fn collapse_blank_lines(text: &str) -> String {
    BLANK_RUNS.replace_all(text, "\n\n").trim().to_string()
}

/// Removes every match of each pattern, in order.
#[must_use]
pub fn apply_removals(text: &str, patterns: &[Regex]) -> String {
    patterns.iter().fold(text.to_string(), |acc, re| {
        re.replace_all(&acc, "").into_owned()
    })
}

/// Compiles a built-in pattern.
///
/// # Panics
///
/// Panics on an invalid pattern; only used for literal patterns that the
/// catalog tests compile.
#[allow(clippy::expect_used)]
pub(crate) fn pattern(re: &str) -> Regex {
    Regex::new(re).expect("built-in policy pattern is valid")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapse_blank_lines() {
        assert_eq!(collapse_blank_lines("a\n\n\n\nb"), "a\n\nb");
        assert_eq!(collapse_blank_lines("a\n\nb"), "a\n\nb");
        assert_eq!(collapse_blank_lines("\n\n a \n\n\n"), "a");
    }

    #[test]
    fn test_apply_removals_in_order() {
        let patterns = vec![pattern(r"foo"), pattern(r"bar\s*")];
        assert_eq!(apply_removals("foobar baz", &patterns), "baz");
    }

    #[test]
    fn test_apply_removals_empty() {
        assert_eq!(apply_removals("unchanged", &[]), "unchanged");
    }
}
