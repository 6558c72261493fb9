//! JSON executor for the built-in tools.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

use super::definitions::{BATCH_TOOL, QUERY_TOOL, SCRAPE_TOOL, SCREENSHOT_TOOL};
use super::format::{truncate, OutputFormat};
use super::{builtin_definitions, ToolDefinition, ToolInput, ToolOutput};
use crate::core::FetchResult;
use crate::errors::ToolError;
use crate::fetch::StrategyKind;
use crate::pipeline::{CrawlOptions, Crawler};

fn default_batch_max_chars() -> usize {
    5000
}

fn default_query_limit() -> i64 {
    10
}

fn default_screenshot_wait() -> f64 {
    1.0
}

#[derive(Debug, Deserialize)]
struct ScrapeArgs {
    url: String,
    #[serde(default)]
    format: OutputFormat,
    #[serde(default)]
    selector: Option<String>,
    #[serde(default)]
    wait: f64,
    #[serde(default)]
    scroll: bool,
    #[serde(default)]
    max_chars: usize,
    #[serde(default)]
    no_cache: bool,
}

#[derive(Debug, Deserialize)]
struct BatchArgs {
    urls: Vec<String>,
    #[serde(default)]
    format: OutputFormat,
    #[serde(default = "default_batch_max_chars")]
    max_chars: usize,
}

#[derive(Debug, Deserialize)]
struct QueryArgs {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    domain: Option<String>,
    #[serde(default)]
    keyword: Option<String>,
    #[serde(default = "default_query_limit")]
    limit: i64,
}

#[derive(Debug, Deserialize)]
struct ScreenshotArgs {
    url: String,
    #[serde(default = "default_screenshot_wait")]
    wait: f64,
}

/// Runs tool calls against a shared [`Crawler`].
///
/// Every call yields a [`ToolOutput`]; unknown tools and malformed
/// arguments come back as failed outputs.
#[derive(Debug, Clone)]
pub struct ToolExecutor {
    crawler: Arc<Crawler>,
}

impl ToolExecutor {
    /// Creates an executor around `crawler`.
    #[must_use]
    pub fn new(crawler: Arc<Crawler>) -> Self {
        Self { crawler }
    }

    /// The tools this executor understands.
    #[must_use]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        builtin_definitions()
    }

    /// Executes `input`.
    pub async fn execute(&self, input: &ToolInput) -> ToolOutput {
        debug!(tool = %input.tool_name, call_id = %input.call_id, "Tool invoked");
        let outcome = match input.tool_name.as_str() {
            SCRAPE_TOOL => self.scrape(&input.arguments).await,
            BATCH_TOOL => self.batch(&input.arguments).await,
            QUERY_TOOL => self.query(&input.arguments).await,
            SCREENSHOT_TOOL => self.screenshot(&input.arguments).await,
            other => Err(ToolError::NotFound {
                name: other.to_string(),
            }),
        };
        outcome.unwrap_or_else(|e| {
            warn!(tool = %input.tool_name, error = %e, "Tool failed");
            ToolOutput::fail(e.to_string())
        })
    }

    /// Executes `name` with `arguments`.
    pub async fn call(&self, name: &str, arguments: serde_json::Value) -> ToolOutput {
        self.execute(&ToolInput::new(name, arguments)).await
    }

    async fn scrape(&self, arguments: &serde_json::Value) -> Result<ToolOutput, ToolError> {
        let args: ScrapeArgs = parse_args(SCRAPE_TOOL, arguments)?;
        require_url(SCRAPE_TOOL, &args.url)?;
        require_seconds(SCRAPE_TOOL, "wait", args.wait)?;

        let mut config = self
            .crawler
            .config()
            .default_fetch_config()
            .with_wait(args.wait)
            .with_scroll(args.scroll);
        if let Some(selector) = args.selector {
            config = config.with_selector(selector);
        }
        let mut options = CrawlOptions::new().saving().with_fetch_config(config);
        if args.no_cache {
            options = options.fresh();
        }

        let result = self.crawler.crawl(&args.url, &options).await;
        let payload = scrape_payload(&result, args.format, args.max_chars);
        Ok(match result.error {
            Some(ref error) if result.is_failed() => ToolOutput::fail_with_data(error.clone(), payload),
            _ => ToolOutput::ok(payload),
        })
    }

    async fn batch(&self, arguments: &serde_json::Value) -> Result<ToolOutput, ToolError> {
        let args: BatchArgs = parse_args(BATCH_TOOL, arguments)?;
        let options = CrawlOptions::new().saving();
        let results = self.crawler.crawl_batch(&args.urls, &options).await;
        let items: Vec<serde_json::Value> = results
            .iter()
            .map(|result| scrape_payload(result, args.format, args.max_chars))
            .collect();
        Ok(ToolOutput::ok(serde_json::Value::Array(items)))
    }

    async fn query(&self, arguments: &serde_json::Value) -> Result<ToolOutput, ToolError> {
        let args: QueryArgs = parse_args(QUERY_TOOL, arguments)?;
        let limit = args.limit.max(1);
        let store = self.crawler.store().await.map_err(|e| failed(QUERY_TOOL, e))?;

        let rows = if let Some(url) = non_empty(args.url.as_deref()) {
            store.get_by_url(url).await
        } else if let Some(domain) = non_empty(args.domain.as_deref()) {
            store.get_by_domain(domain, limit).await
        } else if let Some(keyword) = non_empty(args.keyword.as_deref()) {
            store.search(keyword, limit).await
        } else {
            store.recent(limit).await
        }
        .map_err(|e| failed(QUERY_TOOL, e))?;

        let summaries: Vec<serde_json::Value> = rows.iter().map(|r| r.summary()).collect();
        Ok(ToolOutput::ok(serde_json::Value::Array(summaries)))
    }

    async fn screenshot(&self, arguments: &serde_json::Value) -> Result<ToolOutput, ToolError> {
        let args: ScreenshotArgs = parse_args(SCREENSHOT_TOOL, arguments)?;
        require_url(SCREENSHOT_TOOL, &args.url)?;
        require_seconds(SCREENSHOT_TOOL, "wait", args.wait)?;

        let config = self
            .crawler
            .config()
            .default_fetch_config()
            .with_wait(args.wait)
            .with_screenshot(true);
        let options = CrawlOptions::new()
            .with_fetch_config(config)
            .forcing(StrategyKind::Render);

        let result = self.crawler.crawl(&args.url, &options).await;
        match (result.screenshot_base64(), result.screenshot.as_ref()) {
            (Some(encoded), Some(png)) => Ok(ToolOutput::ok(serde_json::json!({
                "url": args.url,
                "screenshot_base64": encoded,
                "size_bytes": png.len(),
            }))),
            _ => {
                let reason = result
                    .error
                    .unwrap_or_else(|| "renderer returned no screenshot".to_string());
                Ok(ToolOutput::fail_with_data(
                    format!("Screenshot failed: {reason}"),
                    serde_json::json!({"url": args.url}),
                ))
            }
        }
    }
}

fn parse_args<T: DeserializeOwned>(tool: &str, arguments: &serde_json::Value) -> Result<T, ToolError> {
    let value = if arguments.is_null() {
        serde_json::json!({})
    } else {
        arguments.clone()
    };
    serde_json::from_value(value).map_err(|e| ToolError::InvalidArguments {
        name: tool.to_string(),
        reason: e.to_string(),
    })
}

fn require_url(tool: &str, url: &str) -> Result<(), ToolError> {
    if url.trim().is_empty() {
        return Err(ToolError::InvalidArguments {
            name: tool.to_string(),
            reason: "url must not be empty".to_string(),
        });
    }
    Ok(())
}

fn require_seconds(tool: &str, field: &str, seconds: f64) -> Result<(), ToolError> {
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(ToolError::InvalidArguments {
            name: tool.to_string(),
            reason: format!("{field} must be a non-negative number of seconds, got {seconds:?}"),
        });
    }
    Ok(())
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn failed(tool: &str, error: impl std::fmt::Display) -> ToolError {
    ToolError::ExecutionFailed {
        name: tool.to_string(),
        reason: error.to_string(),
    }
}

/// Per-address response body shared by the scrape and batch tools.
fn scrape_payload(result: &FetchResult, format: OutputFormat, max_chars: usize) -> serde_json::Value {
    let content = truncate(&format.render(result), max_chars);
    let mut payload = serde_json::json!({
        "url": result.url,
        "title": result.title,
        "char_count": content.chars().count(),
        "content": content,
        "strategy": result.strategy,
        "status": result.status.as_str(),
        "duration_ms": result.duration_ms,
    });
    if let Some(ref error) = result.error {
        payload["error"] = serde_json::json!(error);
    }
    payload
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CrawlConfig;
    use crate::core::FetchStatus;
    use crate::testing::ScriptedStrategy;
    use pretty_assertions::assert_eq;

    fn executor(render: ScriptedStrategy, dir: &tempfile::TempDir) -> ToolExecutor {
        let config = CrawlConfig::default().with_storage_dir(dir.path()).without_proxy();
        ToolExecutor::new(Arc::new(Crawler::new(config, Arc::new(render))))
    }

    #[tokio::test]
    async fn test_unknown_tool_fails() {
        let dir = tempfile::tempdir().unwrap();
        let output = executor(ScriptedStrategy::render(), &dir)
            .call("crawlflow_delete", serde_json::json!({}))
            .await;
        assert!(!output.success);
        assert_eq!(output.error.as_deref(), Some("Tool not found: crawlflow_delete"));
    }

    #[tokio::test]
    async fn test_missing_url_is_invalid_arguments() {
        let dir = tempfile::tempdir().unwrap();
        let exec = executor(ScriptedStrategy::render(), &dir);
        let output = exec.call(SCRAPE_TOOL, serde_json::json!({"format": "text"})).await;
        assert!(!output.success);
        assert!(output.error.unwrap().starts_with("Invalid arguments for tool crawlflow_scrape"));

        let output = exec.call(SCRAPE_TOOL, serde_json::json!({"url": "  "})).await;
        assert!(!output.success);
    }

    #[tokio::test]
    async fn test_negative_wait_is_invalid_arguments() {
        let dir = tempfile::tempdir().unwrap();
        let render = Arc::new(ScriptedStrategy::render());
        let config = CrawlConfig::default().with_storage_dir(dir.path()).without_proxy();
        let exec = ToolExecutor::new(Arc::new(Crawler::new(
            config,
            Arc::clone(&render) as Arc<dyn crate::fetch::FetchStrategy>,
        )));

        for tool in [SCRAPE_TOOL, SCREENSHOT_TOOL] {
            let output = exec
                .call(tool, serde_json::json!({"url": "https://example.com/a", "wait": -100.0}))
                .await;
            assert!(!output.success);
            let error = output.error.unwrap();
            assert!(error.starts_with(&format!("Invalid arguments for tool {tool}")));
            assert!(error.contains("wait must be a non-negative number of seconds"));
        }
        assert_eq!(render.call_count(), 0);
    }

    #[tokio::test]
    async fn test_oversized_wait_fails_without_panicking() {
        let dir = tempfile::tempdir().unwrap();
        let output = executor(ScriptedStrategy::render(), &dir)
            .call(SCRAPE_TOOL, serde_json::json!({"url": "https://example.com/a", "wait": 1e308}))
            .await;

        assert!(!output.success);
        assert!(output.error.unwrap().contains("invalid wait"));
        assert_eq!(output.data.unwrap()["status"], serde_json::json!("failed"));
    }

    #[tokio::test]
    async fn test_scrape_truncates_and_reports() {
        let dir = tempfile::tempdir().unwrap();
        let render = ScriptedStrategy::render().with_response(
            "https://example.com/a",
            FetchResult::new("", "").with_title("A").with_raw_body("abcdefghij"),
        );
        let output = executor(render, &dir)
            .call(SCRAPE_TOOL, serde_json::json!({"url": "https://example.com/a", "max_chars": 4}))
            .await;

        assert!(output.success);
        let data = output.data.unwrap();
        assert_eq!(data["title"], serde_json::json!("A"));
        assert_eq!(data["content"], serde_json::json!("abcd\n\n... (truncated at 4 chars)"));
        assert_eq!(data["status"], serde_json::json!("success"));
        assert_eq!(data["strategy"], serde_json::json!("render"));
    }

    #[tokio::test]
    async fn test_scrape_failure_keeps_payload() {
        let dir = tempfile::tempdir().unwrap();
        let render = ScriptedStrategy::render().with_error("https://down.example.com", "connection refused");
        let output = executor(render, &dir)
            .call(SCRAPE_TOOL, serde_json::json!({"url": "https://down.example.com"}))
            .await;

        assert!(!output.success);
        assert!(output.error.unwrap().contains("connection refused"));
        let data = output.data.unwrap();
        assert_eq!(data["status"], serde_json::json!(FetchStatus::Failed.as_str()));
    }

    #[tokio::test]
    async fn test_batch_items_fail_individually() {
        let dir = tempfile::tempdir().unwrap();
        let render = ScriptedStrategy::render().with_error("https://b.example.com", "boom");
        let output = executor(render, &dir)
            .call(
                BATCH_TOOL,
                serde_json::json!({"urls": ["https://a.example.com", "https://b.example.com"]}),
            )
            .await;

        assert!(output.success);
        let items = output.data.unwrap();
        let items = items.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["status"], serde_json::json!("success"));
        assert_eq!(items[1]["status"], serde_json::json!("failed"));
        assert!(items[1]["error"].as_str().unwrap().contains("boom"));
    }

    #[tokio::test]
    async fn test_query_after_scrape() {
        let dir = tempfile::tempdir().unwrap();
        let render = ScriptedStrategy::render().with_response(
            "https://example.com/rust",
            FetchResult::new("", "").with_title("Rust news").with_raw_body("Body"),
        );
        let exec = executor(render, &dir);
        let scraped = exec
            .call(SCRAPE_TOOL, serde_json::json!({"url": "https://example.com/rust"}))
            .await;
        assert!(scraped.success);

        let by_keyword = exec.call(QUERY_TOOL, serde_json::json!({"keyword": "rust"})).await;
        let rows = by_keyword.data.unwrap();
        assert_eq!(rows.as_array().unwrap().len(), 1);
        assert_eq!(rows[0]["title"], serde_json::json!("Rust news"));

        let recent = exec.call(QUERY_TOOL, serde_json::Value::Null).await;
        assert_eq!(recent.data.unwrap().as_array().unwrap().len(), 1);

        let other = exec.call(QUERY_TOOL, serde_json::json!({"domain": "other.com"})).await;
        assert!(other.data.unwrap().as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_screenshot() {
        let dir = tempfile::tempdir().unwrap();
        let render = ScriptedStrategy::render()
            .with_response(
                "https://example.com/shot",
                FetchResult::new("", "").with_screenshot(vec![0x89, b'P', b'N', b'G']),
            )
            .with_response("https://example.com/none", FetchResult::new("", ""));
        let exec = executor(render, &dir);

        let output = exec
            .call(SCREENSHOT_TOOL, serde_json::json!({"url": "https://example.com/shot"}))
            .await;
        assert!(output.success);
        let data = output.data.unwrap();
        assert_eq!(data["size_bytes"], serde_json::json!(4));
        assert_eq!(data["screenshot_base64"], serde_json::json!("iVBORw=="));

        let output = exec
            .call(SCREENSHOT_TOOL, serde_json::json!({"url": "https://example.com/none"}))
            .await;
        assert!(!output.success);
        assert!(output.error.unwrap().starts_with("Screenshot failed"));
    }
}
