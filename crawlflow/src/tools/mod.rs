//! Agent tool surface.
//!
//! Four tools expose the pipeline to agents over plain JSON:
//! - `crawlflow_scrape`: fetch one page
//! - `crawlflow_batch`: fetch several pages
//! - `crawlflow_query`: search crawl history
//! - `crawlflow_screenshot`: capture a page

mod definitions;
mod executor;
mod format;

pub use definitions::{
    builtin_definitions, ToolDefinition, ToolInput, ToolOutput, BATCH_TOOL, QUERY_TOOL, SCRAPE_TOOL,
    SCREENSHOT_TOOL,
};
pub use executor::ToolExecutor;
pub use format::{strip_markup, truncate, OutputFormat};
