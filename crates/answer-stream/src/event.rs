//! Normalized output events.

use serde::Serialize;

use crate::lexer::SegmentKind;
use crate::session::Identifiers;

/// Why the turn ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FinishReason {
    Stop,
    ToolCalls,
}

/// Token usage, normalized across both upstream end-of-turn shapes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
}

impl Usage {
    /// A single aggregate count is attributed entirely to output.
    pub fn from_aggregate(total_tokens: u64) -> Self {
        Self {
            input_tokens: 0,
            output_tokens: total_tokens,
            total_tokens,
        }
    }

    pub fn from_split(prompt_tokens: u64, completion_tokens: u64, total_tokens: u64) -> Self {
        Self {
            input_tokens: prompt_tokens,
            output_tokens: completion_tokens,
            total_tokens,
        }
    }
}

/// One normalized stream part.
///
/// Content arrives in blocks on two channels, `text` and `reasoning`. Each
/// block is `*-start`, any number of `*-delta`, then `*-end`, all sharing one
/// `id`. At most one block is open at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum StreamPart {
    // === Content blocks ===
    TextStart { id: String },
    TextDelta { id: String, delta: String },
    TextEnd { id: String },

    ReasoningStart { id: String },
    ReasoningDelta { id: String, delta: String },
    ReasoningEnd { id: String },

    // === Tool calls (emitted at end of turn) ===
    #[serde(rename_all = "camelCase")]
    ToolInputStart { id: String, tool_name: String },
    ToolInputDelta { id: String, delta: String },
    ToolInputEnd { id: String },
    #[serde(rename_all = "camelCase")]
    ToolCall {
        tool_call_id: String,
        tool_name: String,
        /// Arguments as compact JSON text.
        input: String,
    },

    // === Metadata and lifecycle ===
    /// External message id seen on a content event.
    ResponseMetadata { id: String },

    #[serde(rename_all = "camelCase")]
    Finish {
        finish_reason: FinishReason,
        usage: Usage,
    },

    /// Not terminal; the stream continues.
    Error { error: String },
}

impl StreamPart {
    pub fn block_start(kind: SegmentKind, id: String) -> Self {
        match kind {
            SegmentKind::Plain => StreamPart::TextStart { id },
            SegmentKind::Reasoning => StreamPart::ReasoningStart { id },
        }
    }

    pub fn block_delta(kind: SegmentKind, id: String, delta: String) -> Self {
        match kind {
            SegmentKind::Plain => StreamPart::TextDelta { id, delta },
            SegmentKind::Reasoning => StreamPart::ReasoningDelta { id, delta },
        }
    }

    pub fn block_end(kind: SegmentKind, id: String) -> Self {
        match kind {
            SegmentKind::Plain => StreamPart::TextEnd { id },
            SegmentKind::Reasoning => StreamPart::ReasoningEnd { id },
        }
    }
}

/// A stream part stamped with the identifiers known when it was emitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamEvent {
    #[serde(flatten)]
    pub part: StreamPart,
    #[serde(flatten)]
    pub ids: Identifiers,
}

#[cfg(test)]
mod tests {
    use super::*;

    mod usage {
        use super::*;

        #[test]
        fn aggregate_counts_as_output() {
            assert_eq!(
                Usage::from_aggregate(42),
                Usage {
                    input_tokens: 0,
                    output_tokens: 42,
                    total_tokens: 42,
                }
            );
        }

        #[test]
        fn split_is_copied_unchanged() {
            assert_eq!(
                Usage::from_split(5, 7, 12),
                Usage {
                    input_tokens: 5,
                    output_tokens: 7,
                    total_tokens: 12,
                }
            );
        }
    }

    mod json_format {
        use super::*;
        use serde_json::json;

        #[test]
        fn uses_kebab_case_tag() {
            let part = StreamPart::TextDelta {
                id: "b1".to_string(),
                delta: "Hi".to_string(),
            };
            assert_eq!(
                serde_json::to_value(&part).unwrap(),
                json!({"type": "text-delta", "id": "b1", "delta": "Hi"})
            );
        }

        #[test]
        fn tool_call_fields_are_camel_case() {
            let part = StreamPart::ToolCall {
                tool_call_id: "c1".to_string(),
                tool_name: "search".to_string(),
                input: r#"{"q":"x"}"#.to_string(),
            };
            assert_eq!(
                serde_json::to_value(&part).unwrap(),
                json!({
                    "type": "tool-call",
                    "toolCallId": "c1",
                    "toolName": "search",
                    "input": "{\"q\":\"x\"}"
                })
            );
        }

        #[test]
        fn finish_serializes_reason_and_usage() {
            let part = StreamPart::Finish {
                finish_reason: FinishReason::ToolCalls,
                usage: Usage::from_split(1, 2, 3),
            };
            assert_eq!(
                serde_json::to_value(&part).unwrap(),
                json!({
                    "type": "finish",
                    "finishReason": "tool-calls",
                    "usage": {"inputTokens": 1, "outputTokens": 2, "totalTokens": 3}
                })
            );
        }

        #[test]
        fn event_flattens_identifiers() {
            let event = StreamEvent {
                part: StreamPart::ReasoningEnd {
                    id: "b2".to_string(),
                },
                ids: Identifiers {
                    conversation_id: Some("c1".to_string()),
                    message_id: None,
                    task_id: Some("t1".to_string()),
                },
            };
            assert_eq!(
                serde_json::to_value(&event).unwrap(),
                json!({
                    "type": "reasoning-end",
                    "id": "b2",
                    "conversationId": "c1",
                    "taskId": "t1"
                })
            );
        }
    }

    mod block_helpers {
        use super::*;

        #[test]
        fn plain_maps_to_text_channel() {
            assert_eq!(
                StreamPart::block_start(SegmentKind::Plain, "x".to_string()),
                StreamPart::TextStart {
                    id: "x".to_string()
                }
            );
            assert_eq!(
                StreamPart::block_end(SegmentKind::Plain, "x".to_string()),
                StreamPart::TextEnd {
                    id: "x".to_string()
                }
            );
        }

        #[test]
        fn reasoning_maps_to_reasoning_channel() {
            assert_eq!(
                StreamPart::block_delta(SegmentKind::Reasoning, "y".to_string(), "d".to_string()),
                StreamPart::ReasoningDelta {
                    id: "y".to_string(),
                    delta: "d".to_string()
                }
            );
        }
    }
}
