//! # answer-stream
//!
//! Normalizes the event feed of a hosted text-generation service into a
//! typed stream of content blocks, tool calls and a final usage report.
//!
//! The crate is transport-agnostic: callers decode upstream payloads with
//! [`decode_event`] and hand each result to a [`StreamCoordinator`].
//!
//! ## Key Concepts
//!
//! - **Segment**: A run of answer text classified as plain or reasoning by
//!   the [`TagLexer`]
//! - **Block**: A `*-start` / `*-delta` / `*-end` group on the text or
//!   reasoning channel
//! - **Tool call**: A JSON object naming a declared tool, recovered from the
//!   plain text at end of turn
//! - **Tools prompt**: The instruction text announcing declared tools to the
//!   model, see [`format_tools_prompt`]

pub mod config;
pub mod coordinator;
pub mod error;
pub mod event;
pub mod lexer;
pub mod logging;
pub mod session;
pub mod tool_calls;
pub mod tools_prompt;
pub mod upstream;

// Re-export commonly used types
pub use config::{AbortPolicy, StreamConfig};
pub use coordinator::StreamCoordinator;
pub use error::{ConfigError, DecodeError, StreamError};
pub use event::{FinishReason, StreamEvent, StreamPart, Usage};
pub use lexer::{Segment, SegmentKind, TagLexer};
pub use session::{Identifiers, SessionId};
pub use tool_calls::{extract_tool_calls, Extraction, ToolCall};
pub use tools_prompt::{format_tools_prompt, ToolDefinition, ToolsPrompt};
pub use upstream::{decode_event, UpstreamEvent};
