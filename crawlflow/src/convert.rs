//! HTML helpers shared by the HTTP strategy and the readability extractor.
//!
//! Markdown conversion itself is delegated to `htmd`; this module only
//! prunes the DOM before conversion and pulls out titles and links.

use htmd::HtmlToMarkdown;
use scraper::{Html, Selector};
use tracing::debug;

use crate::errors::CrawlflowError;

/// Tags dropped during conversion.
pub const SKIPPED_TAGS: &[&str] = &["script", "style", "nav", "footer", "noscript", "svg"];

/// Converts markup to markdown, skipping [`SKIPPED_TAGS`].
pub fn html_to_markdown(html: &str) -> Result<String, CrawlflowError> {
    let converter = HtmlToMarkdown::builder()
        .skip_tags(SKIPPED_TAGS.to_vec())
        .build();
    converter
        .convert(html)
        .map(|md| md.trim().to_string())
        .map_err(|e| CrawlflowError::extraction(format!("markdown conversion failed: {e}")))
}

/// Parses a list of CSS selectors, dropping any that do not parse.
#[must_use]
pub fn parse_selectors(selectors: &[&str]) -> Vec<Selector> {
    selectors
        .iter()
        .filter_map(|s| match Selector::parse(s) {
            Ok(sel) => Some(sel),
            Err(e) => {
                debug!(selector = %s, error = %e, "Skipping invalid selector");
                None
            }
        })
        .collect()
}

/// Removes every element matching one of `selectors` from `document`.
pub fn remove_matching(document: &mut Html, selectors: &[Selector]) {
    for selector in selectors {
        let ids: Vec<_> = document.select(selector).map(|el| el.id()).collect();
        for id in ids {
            if let Some(mut node) = document.tree.get_mut(id) {
                node.detach();
            }
        }
    }
}

/// Text of the `<title>` element, trimmed; empty when absent.
#[must_use]
pub fn extract_title(document: &Html) -> String {
    Selector::parse("title")
        .ok()
        .and_then(|sel| {
            document
                .select(&sel)
                .next()
                .map(|el| el.text().collect::<String>().trim().to_string())
        })
        .unwrap_or_default()
}

/// Absolute `http(s)` links found in `document`, deduplicated in document order.
#[must_use]
pub fn extract_links(document: &Html, base_url: &str) -> Vec<String> {
    let Ok(sel) = Selector::parse("a[href]") else {
        return Vec::new();
    };
    let base = url::Url::parse(base_url).ok();
    let mut seen = std::collections::HashSet::new();
    let mut links = Vec::new();

    for el in document.select(&sel) {
        let Some(href) = el.value().attr("href") else {
            continue;
        };
        let href = href.trim();
        if href.is_empty() || href.starts_with('#') {
            continue;
        }
        let resolved = match &base {
            Some(base) => base.join(href).ok(),
            None => url::Url::parse(href).ok(),
        };
        let Some(mut resolved) = resolved else {
            continue;
        };
        if !matches!(resolved.scheme(), "http" | "https") {
            continue;
        }
        resolved.set_fragment(None);
        let link = resolved.to_string();
        if seen.insert(link.clone()) {
            links.push(link);
        }
    }
    links
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_html_to_markdown_skips_noise_tags() {
        let html = "<html><body><nav>Menu</nav><h1>Title</h1><p>Body text</p>\
                    <script>var x = 1;</script><footer>Foot</footer></body></html>";
        let md = html_to_markdown(html).unwrap();
        assert!(md.contains("Title"));
        assert!(md.contains("Body text"));
        assert!(!md.contains("Menu"));
        assert!(!md.contains("var x"));
        assert!(!md.contains("Foot"));
    }

    #[test]
    fn test_remove_matching() {
        let mut doc = Html::parse_document(
            r#"<html><body><div class="ad">Buy</div><p>Keep</p></body></html>"#,
        );
        remove_matching(&mut doc, &parse_selectors(&[".ad"]));
        let html = doc.html();
        assert!(!html.contains("Buy"));
        assert!(html.contains("Keep"));
    }

    #[test]
    fn test_invalid_selectors_are_skipped() {
        let selectors = parse_selectors(&["article", "[[[", "main"]);
        assert_eq!(selectors.len(), 2);
    }

    #[test]
    fn test_extract_title() {
        let doc = Html::parse_document("<html><head><title> Hello </title></head></html>");
        assert_eq!(extract_title(&doc), "Hello");

        let doc = Html::parse_document("<html><body>no title</body></html>");
        assert_eq!(extract_title(&doc), "");
    }

    #[test]
    fn test_extract_links_resolves_and_dedupes() {
        let doc = Html::parse_document(
            r##"<a href="/a">A</a><a href="https://x.com/b#frag">B</a>
                <a href="/a">again</a><a href="mailto:me@x.com">mail</a><a href="#top">top</a>"##,
        );
        let links = extract_links(&doc, "https://example.com/page");
        assert_eq!(
            links,
            vec![
                "https://example.com/a".to_string(),
                "https://x.com/b".to_string(),
            ]
        );
    }
}
