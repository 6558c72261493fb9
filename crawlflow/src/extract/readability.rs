//! Main-content extractor built on `scraper` and `htmd`.
//!
//! Strips page chrome, picks the first main-content container holding enough
//! text (falling back to `<body>`), converts it to markdown, and reads
//! article metadata from `<meta>` tags.

use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;

use super::config::ExtractionConfig;
use super::{ContentExtractor, Extraction};
use crate::convert;
use crate::errors::CrawlflowError;
use crate::policy::collapse_blank_lines;

/// Metadata keys and the selectors that feed them, in priority order.
const META_SOURCES: &[(&str, &[&str])] = &[
    (
        "author",
        &[
            "meta[name='author']",
            "meta[property='article:author']",
            "meta[name='twitter:creator']",
        ],
    ),
    (
        "date",
        &[
            "meta[property='article:published_time']",
            "meta[name='date']",
            "meta[itemprop='datePublished']",
            "meta[name='pubdate']",
        ],
    ),
    (
        "sitename",
        &["meta[property='og:site_name']", "meta[name='application-name']"],
    ),
    ("categories", &["meta[property='article:section']"]),
];

/// Extractor using selector heuristics.
#[derive(Debug, Clone)]
pub struct ReadabilityExtractor {
    remove: Vec<Selector>,
    content: Vec<Selector>,
    min_text_length: usize,
}

impl Default for ReadabilityExtractor {
    fn default() -> Self {
        Self::new(&ExtractionConfig::default())
    }
}

impl ReadabilityExtractor {
    /// Creates an extractor from `config`. Unparseable selectors are skipped.
    #[must_use]
    pub fn new(config: &ExtractionConfig) -> Self {
        let remove: Vec<&str> = config.remove_selectors.iter().map(String::as_str).collect();
        let content: Vec<&str> = config
            .main_content_selectors
            .iter()
            .map(String::as_str)
            .collect();
        Self {
            remove: convert::parse_selectors(&remove),
            content: convert::parse_selectors(&content),
            min_text_length: config.min_text_length,
        }
    }

    fn main_content<'a>(&self, document: &'a Html) -> Option<ElementRef<'a>> {
        for selector in &self.content {
            let found = document.select(selector).find(|el| {
                el.text().map(str::trim).map(str::len).sum::<usize>() >= self.min_text_length
            });
            if found.is_some() {
                return found;
            }
        }
        let body = Selector::parse("body").ok()?;
        document.select(&body).next()
    }
}

fn meta_content(document: &Html, selector: &str) -> Vec<String> {
    let Ok(sel) = Selector::parse(selector) else {
        return Vec::new();
    };
    document
        .select(&sel)
        .filter_map(|el| el.value().attr("content"))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn first_meta(document: &Html, selectors: &[&str]) -> Option<String> {
    selectors
        .iter()
        .find_map(|sel| meta_content(document, sel).into_iter().next())
}

fn read_metadata(document: &Html) -> HashMap<String, serde_json::Value> {
    let mut metadata = HashMap::new();
    for (key, selectors) in META_SOURCES {
        if let Some(value) = first_meta(document, selectors) {
            metadata.insert((*key).to_string(), serde_json::json!(value));
        }
    }
    if !metadata.contains_key("date") {
        if let Ok(sel) = Selector::parse("time[datetime]") {
            if let Some(dt) = document
                .select(&sel)
                .find_map(|el| el.value().attr("datetime"))
                .filter(|s| !s.trim().is_empty())
            {
                metadata.insert("date".to_string(), serde_json::json!(dt.trim()));
            }
        }
    }

    let mut tags = meta_content(document, "meta[property='article:tag']");
    if tags.is_empty() {
        tags = first_meta(document, &["meta[name='keywords']"])
            .map(|kw| {
                kw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
    }
    if !tags.is_empty() {
        metadata.insert("tags".to_string(), serde_json::json!(tags.join(", ")));
    }
    metadata
}

fn read_title(document: &Html) -> Option<String> {
    first_meta(document, &["meta[property='og:title']"])
        .or_else(|| Some(convert::extract_title(document)).filter(|t| !t.is_empty()))
        .or_else(|| {
            let h1 = Selector::parse("h1").ok()?;
            document
                .select(&h1)
                .next()
                .map(|el| el.text().collect::<String>().trim().to_string())
                .filter(|t| !t.is_empty())
        })
}

impl ContentExtractor for ReadabilityExtractor {
    fn extract(&self, html: &str) -> Result<Extraction, CrawlflowError> {
        let mut document = Html::parse_document(html);
        // Metadata and title live in <head>, which the removal pass may touch.
        let metadata = read_metadata(&document);
        let title = read_title(&document);

        convert::remove_matching(&mut document, &self.remove);
        let fragment = self
            .main_content(&document)
            .map(|el| el.html())
            .ok_or_else(|| CrawlflowError::extraction("document has no body"))?;
        let body = collapse_blank_lines(&convert::html_to_markdown(&fragment)?);

        Ok(Extraction {
            body,
            title,
            metadata,
        })
    }
}
