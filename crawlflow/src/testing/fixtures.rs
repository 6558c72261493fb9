//! HTML and result fixtures.

use crate::core::{FetchResult, FetchStatus};

/// A news-style article page with chrome around the main content.
pub const ARTICLE_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
  <title>Test Article</title>
  <meta name="author" content="Jane Doe">
  <meta property="article:published_time" content="2026-01-15">
  <meta property="og:site_name" content="Example News">
  <meta property="article:tag" content="tech">
  <meta property="article:tag" content="society">
</head>
<body>
  <nav><a href="/">Home</a> <a href="/about">About</a></nav>
  <article>
    <h1>Main Title</h1>
    <p>This is the first paragraph of the story, long enough to count as real prose for scoring.</p>
    <p>The second paragraph adds detail on the events and quotes several people who were there.</p>
    <p>A third paragraph wraps things up and points readers toward what happens next week.</p>
  </article>
  <footer>Copyright 2026 Example News</footer>
</body>
</html>
"#;

/// A page that is mostly navigation links.
pub const LINK_FARM_HTML: &str = r#"<html><head><title>Links</title></head><body>
<ul>
  <li><a href="https://a.example.com/1">One</a></li>
  <li><a href="https://a.example.com/2">Two</a></li>
  <li><a href="https://a.example.com/3">Three</a></li>
</ul>
</body></html>
"#;

/// Markdown as a renderer produces it for the Hacker News front page.
pub const HN_MARKDOWN: &str = "| | | | |\n| --- | --- | --- | --- |\n| | | | |\n\
1. Show HN: A tiny crawler\n\n| | | | |\n2. Ask HN: Favorite tools?\n\n\n\n";

/// Prose long enough to clear every low-yield threshold.
#[must_use]
pub fn long_prose(paragraphs: usize) -> String {
    (0..paragraphs)
        .map(|i| {
            format!(
                "Paragraph {i} describes the subject in plain sentences so that it reads like an article body."
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// A successful result for `url` carrying [`ARTICLE_HTML`] and a markdown body.
#[must_use]
pub fn article_result(url: &str, strategy: &str) -> FetchResult {
    FetchResult::new(url, strategy)
        .with_title("Test Article")
        .with_raw_body(long_prose(4))
        .with_html(ARTICLE_HTML)
        .with_links(vec![format!("{url}/next")])
        .with_duration_ms(12.0)
}

/// A partial result with an empty body.
#[must_use]
pub fn empty_result(url: &str, strategy: &str) -> FetchResult {
    FetchResult::new(url, strategy).with_status(FetchStatus::Partial)
}
