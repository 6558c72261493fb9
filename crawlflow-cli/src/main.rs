//! `crawlflow` command-line front-end.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use crawlflow::config::CrawlConfig;
use crawlflow::core::FetchStatus;
use crawlflow::fetch::StrategyKind;
use crawlflow::observability::{init_tracing, LoggingFetchObserver};
use crawlflow::pipeline::{CrawlOptions, Crawler};
use crawlflow::tools::{truncate, OutputFormat, ToolExecutor};

const DEFAULT_SCREENSHOT_PATH: &str = "screenshot.png";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Markdown,
    Html,
    Text,
    Screenshot,
    Fit,
}

impl Format {
    fn text_format(self) -> Option<OutputFormat> {
        match self {
            Self::Markdown => Some(OutputFormat::Markdown),
            Self::Html => Some(OutputFormat::Html),
            Self::Text => Some(OutputFormat::Text),
            Self::Fit => Some(OutputFormat::Fit),
            Self::Screenshot => None,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "crawlflow",
    about = "Fetch a web page as markdown, html, text or a screenshot"
)]
struct Cli {
    /// Target address.
    #[arg(required_unless_present = "tool")]
    url: Option<String>,

    /// Proxy address (defaults to the configured proxy).
    #[arg(long)]
    proxy: Option<String>,

    /// Connect directly, ignoring any proxy.
    #[arg(long, default_value_t = false)]
    no_proxy: bool,

    /// Extra seconds to wait for rendering.
    #[arg(long, default_value_t = 0.0, value_parser = parse_seconds)]
    wait: f64,

    /// Only keep content matching this CSS selector.
    #[arg(long)]
    selector: Option<String>,

    /// Write output to this file instead of stdout.
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Output format.
    #[arg(long, short = 'f', value_enum, default_value_t = Format::Markdown)]
    format: Format,

    /// Scroll to load lazy content.
    #[arg(long, default_value_t = false)]
    scroll: bool,

    /// Show the browser window.
    #[arg(long, default_value_t = false)]
    headed: bool,

    /// Cookie file (JSON) for sites that need a login.
    #[arg(long)]
    cookie: Option<PathBuf>,

    /// Script to run in the page before capture.
    #[arg(long)]
    js: Option<String>,

    /// Maximum output characters (0 = unlimited).
    #[arg(long, default_value_t = 0)]
    max_chars: usize,

    /// Fetch timeout in seconds.
    #[arg(long, value_parser = parse_seconds)]
    timeout: Option<f64>,

    /// Disable anti-detection measures.
    #[arg(long, default_value_t = false)]
    no_stealth: bool,

    /// Save the result to local storage.
    #[arg(long, default_value_t = false)]
    save: bool,

    /// Ignore the cache and refetch.
    #[arg(long, default_value_t = false)]
    no_cache: bool,

    /// Debug logging and a metadata summary on stderr.
    #[arg(long, default_value_t = false)]
    verbose: bool,

    /// Emit logs as JSON lines.
    #[arg(long, default_value_t = false)]
    json_logs: bool,

    /// Run one agent tool instead of a plain fetch.
    #[arg(long)]
    tool: Option<String>,

    /// JSON arguments for `--tool`.
    #[arg(long, requires = "tool")]
    args: Option<String>,
}

fn parse_seconds(value: &str) -> Result<f64, String> {
    let seconds: f64 = value.parse().map_err(|e: std::num::ParseFloatError| e.to_string())?;
    crawlflow::fetch::seconds_to_duration("seconds", seconds)
        .map(|_| seconds)
        .map_err(|_| format!("expected a non-negative number of seconds, got {value}"))
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.json_logs).context("initializing logging")?;

    let mut config = CrawlConfig::from_env().context("loading configuration")?;
    if let Some(timeout) = cli.timeout {
        config = config.with_timeout(timeout);
    }
    config.verbose |= cli.verbose;
    config.validate().context("validating configuration")?;

    let mut crawler = Crawler::from_config(config);
    if cli.verbose {
        crawler = crawler.with_observer(Arc::new(LoggingFetchObserver));
    }

    if let Some(ref tool) = cli.tool {
        return run_tool(Arc::new(crawler), tool, cli.args.as_deref()).await;
    }
    let Some(ref url) = cli.url else {
        bail!("an address is required unless --tool is given");
    };
    run_fetch(&crawler, url, &cli).await
}

async fn run_tool(crawler: Arc<Crawler>, tool: &str, args: Option<&str>) -> Result<ExitCode> {
    let arguments: serde_json::Value =
        serde_json::from_str(args.unwrap_or("{}")).context("parsing --args as JSON")?;
    let output = ToolExecutor::new(crawler).call(tool, arguments).await;
    println!("{}", serde_json::to_string_pretty(&output.to_json())?);
    Ok(if output.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn run_fetch(crawler: &Crawler, url: &str, cli: &Cli) -> Result<ExitCode> {
    let base = crawler.config().default_fetch_config();
    let proxy = if cli.no_proxy {
        None
    } else {
        cli.proxy.clone().or(base.proxy.clone())
    };
    let mut fetch = base
        .with_proxy(proxy)
        .with_stealth(!cli.no_stealth)
        .with_headless(!cli.headed)
        .with_wait(cli.wait)
        .with_scroll(cli.scroll)
        .with_screenshot(cli.format == Format::Screenshot);
    if let Some(ref selector) = cli.selector {
        fetch = fetch.with_selector(selector.clone());
    }
    if let Some(ref js) = cli.js {
        fetch = fetch.with_js_code(js.clone());
    }
    if let Some(ref cookie) = cli.cookie {
        fetch = fetch.with_cookie_file(cookie.clone());
    }

    let mut options = CrawlOptions::new().with_fetch_config(fetch);
    if cli.save {
        options = options.saving();
    }
    if cli.no_cache {
        options = options.fresh();
    }
    if cli.format == Format::Screenshot {
        options = options.forcing(StrategyKind::Render);
    }

    tracing::debug!(url = %url, format = ?cli.format, save = cli.save, "Starting fetch");
    let result = crawler.crawl(url, &options).await;

    if result.is_failed() {
        eprintln!("Fetch failed: {}", result.error.as_deref().unwrap_or("unknown error"));
        return Ok(ExitCode::FAILURE);
    }
    if result.status == FetchStatus::Cached {
        eprintln!("Served from cache");
    }

    let Some(format) = cli.format.text_format() else {
        let Some(ref png) = result.screenshot else {
            eprintln!("Screenshot failed");
            return Ok(ExitCode::FAILURE);
        };
        let path = cli
            .output
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SCREENSHOT_PATH));
        std::fs::write(&path, png).with_context(|| format!("writing {}", path.display()))?;
        eprintln!("Screenshot saved: {}", path.display());
        return Ok(ExitCode::SUCCESS);
    };

    let content = truncate(&format.render(&result), cli.max_chars);
    match cli.output {
        Some(ref path) => {
            std::fs::write(path, &content).with_context(|| format!("writing {}", path.display()))?;
            eprintln!("Saved: {} ({} chars)", path.display(), content.chars().count());
        }
        None => println!("{content}"),
    }

    if cli.verbose {
        eprintln!("\n--- metadata ---");
        eprintln!("strategy: {}", result.strategy);
        eprintln!("status: {}", result.status);
        eprintln!("duration: {:.0}ms", result.duration_ms);
        eprintln!("chars: {}", result.char_count());
        eprintln!("domain: {}", result.domain());
        eprintln!("content hash: {}", result.content_fingerprint());
        for (key, value) in &result.metadata {
            eprintln!("{key}: {value}");
        }
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fetch_flags() {
        let cli = Cli::try_parse_from([
            "crawlflow",
            "https://example.com",
            "--no-proxy",
            "-f",
            "fit",
            "--max-chars",
            "100",
            "--save",
        ])
        .unwrap();
        assert_eq!(cli.url.as_deref(), Some("https://example.com"));
        assert!(cli.no_proxy);
        assert_eq!(cli.format, Format::Fit);
        assert_eq!(cli.max_chars, 100);
        assert!(cli.save);
        assert_eq!(cli.format.text_format(), Some(OutputFormat::Fit));
    }

    #[test]
    fn test_url_required_without_tool() {
        assert!(Cli::try_parse_from(["crawlflow"]).is_err());
        let cli = Cli::try_parse_from(["crawlflow", "--tool", "crawlflow_query", "--args", "{}"]).unwrap();
        assert!(cli.url.is_none());
        assert_eq!(cli.tool.as_deref(), Some("crawlflow_query"));
    }

    #[test]
    fn test_out_of_range_seconds_rejected() {
        for flag in ["--wait=-100", "--wait=NaN", "--timeout=inf", "--timeout=1e308"] {
            assert!(
                Cli::try_parse_from(["crawlflow", "https://example.com", flag]).is_err(),
                "{flag} should be rejected"
            );
        }
        let cli = Cli::try_parse_from(["crawlflow", "https://example.com", "--wait", "2.5"]).unwrap();
        assert_eq!(cli.wait, 2.5);
    }

    #[test]
    fn test_screenshot_has_no_text_format() {
        assert_eq!(Format::Screenshot.text_format(), None);
    }
}
