//! Tool-call extraction from free-form answer text.
//!
//! The model is steered (see [`crate::tools_prompt`]) to answer with a JSON
//! object when it wants a tool:
//!
//! ```text
//! Let me check. {"name": "get_weather", "arguments": {"city": "Oslo"}}
//! ```
//!
//! The extractor finds every balanced top-level `{...}` in the text, keeps
//! the ones that parse to `{"name", "arguments"}` with a known name, and
//! removes them from the text.

use serde::Serialize;
use serde_json::Value;

/// A tool invocation found in the answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCall {
    pub id: String,
    /// Canonical name from the allow-list.
    pub name: String,
    /// Compact JSON of the candidate's `arguments`.
    pub input: String,
}

/// Result of [`extract_tool_calls`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Extraction {
    pub calls: Vec<ToolCall>,
    /// The input with every matched call removed, trimmed.
    pub cleaned_text: String,
}

/// Extract tool calls whose name is in `allowed_names`.
///
/// Names match case-insensitively; the emitted call uses the allow-list's
/// spelling. Candidates that are not valid JSON, lack `name` or `arguments`,
/// or name an unknown tool are left in the text untouched.
///
/// Each match removes one occurrence of its exact text, searching from the
/// start of what remains. Two byte-identical calls therefore remove two
/// occurrences.
pub fn extract_tool_calls<F>(text: &str, allowed_names: &[String], mut next_id: F) -> Extraction
where
    F: FnMut() -> String,
{
    if allowed_names.is_empty() {
        return Extraction {
            calls: Vec::new(),
            cleaned_text: text.trim().to_string(),
        };
    }

    let mut calls = Vec::new();
    let mut matched = Vec::new();

    for candidate in json_object_candidates(text) {
        let Some((name, input)) = parse_candidate(candidate, allowed_names) else {
            log::trace!("Skipping non-tool JSON candidate: {}", candidate);
            continue;
        };
        calls.push(ToolCall {
            id: next_id(),
            name,
            input,
        });
        matched.push(candidate);
    }

    let mut cleaned_text = text.to_string();
    for candidate in matched {
        if let Some(pos) = cleaned_text.find(candidate) {
            cleaned_text.replace_range(pos..pos + candidate.len(), "");
        }
    }

    Extraction {
        calls,
        cleaned_text: cleaned_text.trim().to_string(),
    }
}

/// Every balanced top-level `{...}` slice, in order.
///
/// Braces inside `"..."` strings do not count, and quotes are tracked at
/// depth zero too, so an object quoted inside prose is never a candidate.
fn json_object_candidates(text: &str) -> Vec<&str> {
    let mut candidates = Vec::new();
    let mut depth = 0usize;
    let mut start = None;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            // A stray `}` at depth zero is just text.
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    if let Some(start) = start.take() {
                        candidates.push(&text[start..=i]);
                    }
                }
            }
            _ => {}
        }
    }

    candidates
}

/// Returns the canonical name and compact arguments when `candidate` is a
/// call to an allowed tool.
fn parse_candidate(candidate: &str, allowed_names: &[String]) -> Option<(String, String)> {
    let value: Value = serde_json::from_str(candidate).ok()?;
    let object = value.as_object()?;
    let name = object.get("name")?.as_str()?;
    let arguments = object.get("arguments")?;

    let wanted = name.to_lowercase();
    let canonical = allowed_names
        .iter()
        .find(|allowed| allowed.to_lowercase() == wanted)?;

    let input = serde_json::to_string(arguments).ok()?;
    Some((canonical.clone(), input))
}
