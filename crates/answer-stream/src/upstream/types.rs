//! Upstream JSON types.
//!
//! # Protocol Overview
//!
//! The text-generation service streams one JSON object per event, with an
//! `event` discriminator:
//!
//! - `message` / `agent_message`: a fragment of the answer in `answer`
//! - `message_replace`: the complete answer, replacing everything so far
//! - `message_end`: end of turn, usage split into prompt/completion/total
//! - `workflow_finished`: end of turn, a single aggregate `total_tokens`
//! - `agent_thought`: a summary of content already streamed
//! - `message_file`, `ping`: notifications with no answer content
//! - `error`: an application error reported by the service
//!
//! Any event may also carry `conversation_id`, `message_id` and `task_id`.
//! Token counts may be absent or `null`; both read as zero.

use serde::Deserialize;

use crate::event::Usage;

/// Identifiers any upstream event may carry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EventIds {
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub task_id: Option<String>,
}

/// A decoded upstream event.
///
/// # Unknown Kinds
///
/// The service adds event kinds over time (`workflow_started`,
/// `node_finished`, `tts_message`, ...). [`decode_event`](super::decode_event)
/// turns them into `Unknown` with their identifiers instead of failing, and
/// the coordinator ignores everything but those identifiers.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum UpstreamEvent {
    Message(ContentChunk),
    AgentMessage(ContentChunk),
    MessageReplace(ContentChunk),
    MessageEnd(MessageEnd),
    WorkflowFinished(WorkflowFinished),
    AgentThought(Notification),
    MessageFile(Notification),
    Ping(Notification),
    Error(ErrorEvent),
    #[serde(skip)]
    Unknown(EventIds),
}

/// Discriminators with a dedicated variant.
pub(super) const KNOWN_KINDS: &[&str] = &[
    "message",
    "agent_message",
    "message_replace",
    "message_end",
    "workflow_finished",
    "agent_thought",
    "message_file",
    "ping",
    "error",
];

impl UpstreamEvent {
    /// Identifiers carried by this event.
    pub fn ids(&self) -> &EventIds {
        match self {
            UpstreamEvent::Message(e)
            | UpstreamEvent::AgentMessage(e)
            | UpstreamEvent::MessageReplace(e) => &e.ids,
            UpstreamEvent::MessageEnd(e) => &e.ids,
            UpstreamEvent::WorkflowFinished(e) => &e.ids,
            UpstreamEvent::AgentThought(e)
            | UpstreamEvent::MessageFile(e)
            | UpstreamEvent::Ping(e) => &e.ids,
            UpstreamEvent::Error(e) => &e.ids,
            UpstreamEvent::Unknown(ids) => ids,
        }
    }

    /// Discriminator name, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            UpstreamEvent::Message(_) => "message",
            UpstreamEvent::AgentMessage(_) => "agent_message",
            UpstreamEvent::MessageReplace(_) => "message_replace",
            UpstreamEvent::MessageEnd(_) => "message_end",
            UpstreamEvent::WorkflowFinished(_) => "workflow_finished",
            UpstreamEvent::AgentThought(_) => "agent_thought",
            UpstreamEvent::MessageFile(_) => "message_file",
            UpstreamEvent::Ping(_) => "ping",
            UpstreamEvent::Error(_) => "error",
            UpstreamEvent::Unknown(_) => "unknown",
        }
    }
}

/// Answer content: a fragment for `message`, the whole answer for
/// `message_replace`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ContentChunk {
    #[serde(flatten)]
    pub ids: EventIds,
    #[serde(default)]
    pub answer: String,
    /// External message identifier, passed through as response metadata.
    #[serde(default)]
    pub id: Option<String>,
}

/// `message_end`: usage reported as separate counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MessageEnd {
    #[serde(flatten)]
    pub ids: EventIds,
    #[serde(default)]
    pub metadata: Option<MessageEndMetadata>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MessageEndMetadata {
    #[serde(default)]
    pub usage: Option<SplitUsage>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct SplitUsage {
    #[serde(default)]
    pub prompt_tokens: Option<u64>,
    #[serde(default)]
    pub completion_tokens: Option<u64>,
    #[serde(default)]
    pub total_tokens: Option<u64>,
}

impl MessageEnd {
    pub fn usage(&self) -> Usage {
        let split = self
            .metadata
            .as_ref()
            .and_then(|metadata| metadata.usage)
            .unwrap_or_default();
        Usage::from_split(
            split.prompt_tokens.unwrap_or(0),
            split.completion_tokens.unwrap_or(0),
            split.total_tokens.unwrap_or(0),
        )
    }
}

/// `workflow_finished`: usage reported as one aggregate count.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct WorkflowFinished {
    #[serde(flatten)]
    pub ids: EventIds,
    #[serde(default)]
    pub data: Option<WorkflowData>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct WorkflowData {
    #[serde(default)]
    pub total_tokens: Option<u64>,
}

impl WorkflowFinished {
    pub fn usage(&self) -> Usage {
        Usage::from_aggregate(
            self.data
                .as_ref()
                .and_then(|data| data.total_tokens)
                .unwrap_or(0),
        )
    }
}

/// Events with nothing for the answer stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Notification {
    #[serde(flatten)]
    pub ids: EventIds,
}

/// An application error reported by the service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ErrorEvent {
    #[serde(flatten)]
    pub ids: EventIds,
    /// HTTP-like status code, shown next to `code` in the error text.
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

// ============================================================================
// TESTS
// ============================================================================
