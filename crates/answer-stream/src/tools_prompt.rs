//! Tool descriptions for the system prompt.
//!
//! The upstream service has no native tool calling, so the available tools
//! are described in plain text together with the JSON shape the model should
//! answer with. [`crate::tool_calls`] later recognizes that shape.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::LazyLock;

static FIRST_SENTENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?[.!?])(?:\s|$)").unwrap());

const INSTRUCTION: &str = "You can call the following tools. To call a tool, reply with a JSON object of the form {\"name\": \"<tool name>\", \"arguments\": {...}}.";

const MAX_SUMMARY_CHARS: usize = 80;
const MAX_EXAMPLE_PROPERTIES: usize = 3;
const MAX_OBJECT_DEPTH: usize = 2;

/// A tool the caller declared for this request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON schema of the arguments.
    #[serde(default, alias = "inputSchema")]
    pub parameters: Value,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: Option<&str>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.map(str::to_string),
            parameters,
        }
    }
}

/// Output of [`format_tools_prompt`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolsPrompt {
    pub prompt_text: String,
    /// Tool names in declaration order; the allow-list for extraction.
    pub tool_names: Vec<String>,
}

/// Describe `tools` for the model.
///
/// One line per tool: a short summary followed by an example call built
/// from the parameter schema. No tools means an empty prompt.
pub fn format_tools_prompt(tools: &[ToolDefinition]) -> ToolsPrompt {
    if tools.is_empty() {
        return ToolsPrompt::default();
    }

    let mut lines = vec![INSTRUCTION.to_string()];
    for tool in tools {
        let arguments = match example_value(&tool.parameters, 0) {
            Value::Null => json!({}),
            value => value,
        };
        let example = json!({ "name": tool.name, "arguments": arguments });
        lines.push(format!(
            "- {}: {} Call: {}",
            tool.name,
            summarize(tool),
            example
        ));
    }

    ToolsPrompt {
        prompt_text: lines.join("\n"),
        tool_names: tools.iter().map(|tool| tool.name.clone()).collect(),
    }
}

fn summarize(tool: &ToolDefinition) -> String {
    if let Some(curated) = curated_summary(&tool.name) {
        return curated.to_string();
    }

    let description = tool
        .description
        .as_deref()
        .map(|d| d.split_whitespace().collect::<Vec<_>>().join(" "))
        .unwrap_or_default();
    if description.is_empty() {
        return tool.name.clone();
    }

    let sentence = FIRST_SENTENCE_RE
        .captures(&description)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or(description);

    truncate(&sentence, MAX_SUMMARY_CHARS)
}

/// Short descriptions for tools that show up in most setups.
fn curated_summary(name: &str) -> Option<&'static str> {
    match name.to_lowercase().as_str() {
        "web_search" | "search" => Some("Search the web."),
        "web_fetch" | "fetch" => Some("Fetch the contents of a URL."),
        "read_file" => Some("Read a file."),
        "write_file" => Some("Write a file."),
        "list_directory" | "list_dir" => Some("List a directory."),
        "bash" | "shell" | "run_command" => Some("Run a shell command."),
        "get_current_time" => Some("Get the current date and time."),
        _ => None,
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars - 3).collect();
    format!("{}...", kept.trim_end())
}

/// Placeholder value for `schema`; `null` for unknown or absent types.
fn example_value(schema: &Value, depth: usize) -> Value {
    match schema_type(schema) {
        Some("object") => example_object(schema, depth),
        Some("array") => {
            let items = schema.get("items").unwrap_or(&Value::Null);
            json!([example_value(items, depth + 1)])
        }
        Some("string") => json!("..."),
        Some("number") | Some("integer") => json!(0),
        Some("boolean") => json!(true),
        _ => Value::Null,
    }
}

fn example_object(schema: &Value, depth: usize) -> Value {
    let mut object = Map::new();
    if depth >= MAX_OBJECT_DEPTH {
        return Value::Object(object);
    }
    if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
        for (key, property) in properties.iter().take(MAX_EXAMPLE_PROPERTIES) {
            object.insert(key.clone(), example_value(property, depth + 1));
        }
    }
    Value::Object(object)
}

/// The schema's `type`, looking through `["string", "null"]` unions and
/// treating a bare `properties` map as an object.
fn schema_type(schema: &Value) -> Option<&str> {
    match schema.get("type") {
        Some(Value::String(ty)) => Some(ty.as_str()),
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .find(|ty| *ty != "null"),
        _ if schema.get("properties").is_some() => Some("object"),
        _ => None,
    }
}
