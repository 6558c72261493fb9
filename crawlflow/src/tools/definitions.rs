//! Tool definitions and I/O types.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Scrape one page.
pub const SCRAPE_TOOL: &str = "crawlflow_scrape";
/// Scrape several pages.
pub const BATCH_TOOL: &str = "crawlflow_batch";
/// Query crawl history.
pub const QUERY_TOOL: &str = "crawlflow_query";
/// Capture a page screenshot.
pub const SCREENSHOT_TOOL: &str = "crawlflow_screenshot";

/// Definition of a tool that an agent can call.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    /// The tool name.
    pub name: String,
    /// Description of what the tool does.
    pub description: String,
    /// JSON Schema for the arguments.
    pub input_schema: serde_json::Value,
}

impl ToolDefinition {
    /// Creates a new tool definition.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            input_schema: serde_json::json!({"type": "object", "properties": {}}),
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    /// Sets the input schema.
    #[must_use]
    pub fn with_input_schema(mut self, schema: serde_json::Value) -> Self {
        self.input_schema = schema;
        self
    }

    /// Argument names the schema marks as required.
    #[must_use]
    pub fn required_arguments(&self) -> Vec<&str> {
        self.input_schema
            .get("required")
            .and_then(serde_json::Value::as_array)
            .map(|names| names.iter().filter_map(serde_json::Value::as_str).collect())
            .unwrap_or_default()
    }
}

/// Definitions of the four built-in tools.
#[must_use]
pub fn builtin_definitions() -> Vec<ToolDefinition> {
    let formats = serde_json::json!(["markdown", "html", "text", "fit"]);
    vec![
        ToolDefinition::new(SCRAPE_TOOL)
            .with_description(
                "Fetch one web page and return markdown, html or text. Handles \
                 script-rendered pages, CSS selectors and auto-scroll. Results are \
                 cached locally.",
            )
            .with_input_schema(serde_json::json!({
                "type": "object",
                "properties": {
                    "url": {"type": "string", "description": "Target address"},
                    "format": {
                        "type": "string",
                        "enum": formats,
                        "default": "markdown",
                        "description": "Output format (fit = noise-reduced markdown)"
                    },
                    "selector": {"type": "string", "description": "Only keep content matching this CSS selector"},
                    "wait": {"type": "number", "default": 0, "description": "Extra seconds to wait for rendering"},
                    "scroll": {"type": "boolean", "default": false, "description": "Scroll to load lazy content"},
                    "max_chars": {"type": "integer", "default": 0, "description": "Maximum output characters (0 = unlimited)"},
                    "no_cache": {"type": "boolean", "default": false, "description": "Ignore the cache and refetch"}
                },
                "required": ["url"]
            })),
        ToolDefinition::new(BATCH_TOOL)
            .with_description("Fetch several web pages and return a result per address.")
            .with_input_schema(serde_json::json!({
                "type": "object",
                "properties": {
                    "urls": {"type": "array", "items": {"type": "string"}, "description": "Addresses"},
                    "format": {"type": "string", "enum": formats, "default": "markdown"},
                    "max_chars": {"type": "integer", "default": 5000, "description": "Maximum characters per address"}
                },
                "required": ["urls"]
            })),
        ToolDefinition::new(QUERY_TOOL)
            .with_description(
                "Query crawl history by exact address, domain or keyword, or list the \
                 most recent crawls.",
            )
            .with_input_schema(serde_json::json!({
                "type": "object",
                "properties": {
                    "url": {"type": "string", "description": "Exact address"},
                    "domain": {"type": "string", "description": "Domain, e.g. example.com"},
                    "keyword": {"type": "string", "description": "Substring of title or address"},
                    "limit": {"type": "integer", "default": 10, "description": "Maximum rows"}
                }
            })),
        ToolDefinition::new(SCREENSHOT_TOOL)
            .with_description("Capture a web page and return a base64-encoded PNG.")
            .with_input_schema(serde_json::json!({
                "type": "object",
                "properties": {
                    "url": {"type": "string", "description": "Target address"},
                    "wait": {"type": "number", "default": 1, "description": "Seconds to wait before capture"}
                },
                "required": ["url"]
            })),
    ]
}

/// Input to a tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInput {
    /// The call ID.
    pub call_id: Uuid,
    /// The tool name.
    pub tool_name: String,
    /// The arguments object.
    pub arguments: serde_json::Value,
}

impl ToolInput {
    /// Creates a new tool input.
    #[must_use]
    pub fn new(tool_name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            call_id: Uuid::new_v4(),
            tool_name: tool_name.into(),
            arguments,
        }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("call_id".to_string(), serde_json::json!(self.call_id.to_string()));
        map.insert("tool_name".to_string(), serde_json::json!(self.tool_name));
        map.insert("arguments".to_string(), self.arguments.clone());
        map
    }
}

/// Output from a tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    /// Whether the execution succeeded.
    pub success: bool,
    /// The output data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// Error message if failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolOutput {
    /// Creates a successful output.
    #[must_use]
    pub fn ok(data: serde_json::Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Creates a failure output.
    #[must_use]
    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }

    /// Creates a failure output that still carries data.
    #[must_use]
    pub fn fail_with_data(error: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            success: false,
            data: Some(data),
            error: Some(error.into()),
        }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("success".to_string(), serde_json::json!(self.success));

        if let Some(ref data) = self.data {
            map.insert("data".to_string(), data.clone());
        }
        if let Some(ref error) = self.error {
            map.insert("error".to_string(), serde_json::json!(error));
        }

        map
    }

    /// Serializes to a JSON value.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!(self.to_dict())
    }
}
