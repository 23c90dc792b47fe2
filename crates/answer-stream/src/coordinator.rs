//! Stream event coordinator.
//!
//! Turns decoded upstream events into normalized [`StreamEvent`]s, one
//! upstream event at a time.
//!
//! # How The Coordinator Works
//!
//! - Content events feed the [`TagLexer`]; each segment it returns goes on
//!   the text or reasoning channel, opening and closing blocks as needed.
//! - A replace event restarts the lexer and re-emits the whole answer as
//!   one text block.
//! - The first terminal event finalizes the session: trailing lexer text is
//!   flushed, tool calls are extracted from the accumulated plain text, the
//!   open block is closed and a single `finish` part is emitted.
//! - Errors, upstream or decode, become `error` parts. Nothing stops the
//!   session.

use crate::config::{AbortPolicy, StreamConfig};
use crate::error::{ConfigError, DecodeError, StreamError};
use crate::event::{FinishReason, StreamEvent, StreamPart, Usage};
use crate::lexer::{Segment, SegmentKind, TagLexer};
use crate::logging::{is_enabled, log_line, open_log_file, LogHandle};
use crate::session::{Identifiers, SessionId};
use crate::tool_calls::extract_tool_calls;
use crate::upstream::{ContentChunk, ErrorEvent, UpstreamEvent};

/// Source of block and tool-call ids.
pub type IdGenerator = Box<dyn FnMut() -> String + Send>;

fn uuid_ids() -> IdGenerator {
    Box::new(|| uuid::Uuid::new_v4().to_string())
}

/// The content block currently open, if any.
#[derive(Debug, Clone)]
struct OpenBlock {
    kind: SegmentKind,
    id: String,
}

/// Per-request session state.
///
/// One coordinator serves exactly one in-flight request. It is `Send`, so it
/// can move into the task that reads the upstream feed, but it is never
/// shared.
pub struct StreamCoordinator {
    session_id: SessionId,
    abort_policy: AbortPolicy,
    lexer: TagLexer,
    /// Allow-list for tool-call extraction, fixed for the session.
    tool_names: Vec<String>,
    ids: Identifiers,
    /// At most one block is open, so one slot covers both channels.
    open_block: Option<OpenBlock>,
    any_block_opened: bool,
    finished: bool,
    next_id: IdGenerator,
    trace: LogHandle,
    /// Whether `trace` holds a file; checked before formatting trace lines.
    tracing: bool,
}

impl std::fmt::Debug for StreamCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamCoordinator")
            .field("session_id", &self.session_id)
            .field("tool_names", &self.tool_names)
            .field("ids", &self.ids)
            .field("open_block", &self.open_block)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

impl StreamCoordinator {
    /// Create a coordinator for one request.
    ///
    /// `tool_names` is the allow-list of declared tools, usually
    /// [`ToolsPrompt::tool_names`](crate::tools_prompt::ToolsPrompt).
    pub fn new(config: StreamConfig, tool_names: Vec<String>) -> Result<Self, ConfigError> {
        config.validate()?;

        let session_id = SessionId::new();
        let trace = open_log_file(config.trace_log_dir.as_deref(), &session_id.0);
        let tracing = is_enabled(&trace);

        Ok(Self {
            lexer: TagLexer::from_config(&config),
            abort_policy: config.abort_policy,
            session_id,
            tool_names,
            ids: Identifiers::default(),
            open_block: None,
            any_block_opened: false,
            finished: false,
            next_id: uuid_ids(),
            trace,
            tracing,
        })
    }

    /// Replace the UUID id source, e.g. with a deterministic sequence.
    pub fn with_id_generator<F>(mut self, next_id: F) -> Self
    where
        F: FnMut() -> String + Send + 'static,
    {
        self.next_id = Box::new(next_id);
        self
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn identifiers(&self) -> &Identifiers {
        &self.ids
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.ids.conversation_id.as_deref()
    }

    pub fn message_id(&self) -> Option<&str> {
        self.ids.message_id.as_deref()
    }

    pub fn task_id(&self) -> Option<&str> {
        self.ids.task_id.as_deref()
    }

    pub fn tool_names(&self) -> &[String] {
        &self.tool_names
    }

    pub fn is_text_block_open(&self) -> bool {
        matches!(&self.open_block, Some(block) if block.kind == SegmentKind::Plain)
    }

    pub fn is_reasoning_block_open(&self) -> bool {
        matches!(&self.open_block, Some(block) if block.kind == SegmentKind::Reasoning)
    }

    /// True once a terminal event has produced the `finish` part.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Process one decoded upstream event, or the decoder's failure.
    ///
    /// Never fails: problems become `error` parts and the session carries on.
    pub fn process(&mut self, event: Result<UpstreamEvent, DecodeError>) -> Vec<StreamEvent> {
        if self.tracing {
            log_line(&self.trace, "IN", &format!("{:?}", event));
        }

        let mut parts = Vec::new();
        match event {
            Ok(event) => self.handle(event, &mut parts),
            Err(err) => {
                log::warn!("Session {}: undecodable upstream event: {}", self.session_id, err);
                parts.push(StreamPart::Error {
                    error: StreamError::from(err).to_string(),
                });
            }
        }
        self.stamp(parts)
    }

    /// Finish a session whose upstream ended without a terminal event.
    ///
    /// What happens depends on [`AbortPolicy`]. No `finish` part is emitted
    /// either way.
    pub fn finish_aborted(&mut self) -> Vec<StreamEvent> {
        if self.finished {
            return Vec::new();
        }

        let mut parts = Vec::new();
        match self.abort_policy {
            AbortPolicy::Lenient => {
                log::debug!(
                    "Session {}: upstream aborted, leaving blocks as they are",
                    self.session_id
                );
            }
            AbortPolicy::CloseOpenBlocks => {
                for segment in self.lexer.flush() {
                    self.apply_segment(segment, &mut parts);
                }
                self.close_open_block(&mut parts);
            }
        }
        self.stamp(parts)
    }

    fn handle(&mut self, event: UpstreamEvent, parts: &mut Vec<StreamPart>) {
        self.ids.absorb(event.ids());
        let kind = event.kind();

        match event {
            UpstreamEvent::Message(chunk) | UpstreamEvent::AgentMessage(chunk) => {
                self.on_content(chunk, parts)
            }
            UpstreamEvent::MessageReplace(chunk) => self.on_replace(chunk, parts),
            UpstreamEvent::MessageEnd(end) => self.on_terminal(end.usage(), parts),
            UpstreamEvent::WorkflowFinished(finished) => self.on_terminal(finished.usage(), parts),
            UpstreamEvent::Error(err) => self.on_upstream_error(err, parts),
            UpstreamEvent::AgentThought(_)
            | UpstreamEvent::MessageFile(_)
            | UpstreamEvent::Ping(_)
            | UpstreamEvent::Unknown(_) => {
                log::debug!("Session {}: ignoring {} event", self.session_id, kind);
            }
        }
    }

    fn on_content(&mut self, chunk: ContentChunk, parts: &mut Vec<StreamPart>) {
        if !chunk.answer.is_empty() {
            for segment in self.lexer.feed(&chunk.answer) {
                self.apply_segment(segment, parts);
            }
        }

        if let Some(id) = chunk.id.filter(|id| !id.is_empty()) {
            parts.push(StreamPart::ResponseMetadata { id });
        }
    }

    fn on_replace(&mut self, chunk: ContentChunk, parts: &mut Vec<StreamPart>) {
        self.lexer.reset(&chunk.answer);
        // A partial tag left by the replay is part of the text emitted below.
        self.lexer.flush();

        self.close_open_block(parts);
        let id = self.open(SegmentKind::Plain, parts);
        if !chunk.answer.is_empty() {
            parts.push(StreamPart::TextDelta {
                id,
                delta: chunk.answer,
            });
        }
    }

    fn on_terminal(&mut self, usage: Usage, parts: &mut Vec<StreamPart>) {
        if self.finished {
            log::debug!(
                "Session {}: ignoring terminal event after finish",
                self.session_id
            );
            return;
        }
        self.finished = true;

        for segment in self.lexer.flush() {
            self.apply_segment(segment, parts);
        }

        let text = self.lexer.accumulated_plain_text();
        let extraction = extract_tool_calls(&text, &self.tool_names, &mut self.next_id);

        self.close_open_block(parts);

        if !self.any_block_opened && extraction.calls.is_empty() {
            let id = self.open(SegmentKind::Plain, parts);
            self.open_block = None;
            parts.push(StreamPart::TextEnd { id });
        }

        let finish_reason = if extraction.calls.is_empty() {
            FinishReason::Stop
        } else {
            FinishReason::ToolCalls
        };

        for call in extraction.calls {
            parts.push(StreamPart::ToolInputStart {
                id: call.id.clone(),
                tool_name: call.name.clone(),
            });
            parts.push(StreamPart::ToolInputDelta {
                id: call.id.clone(),
                delta: call.input.clone(),
            });
            parts.push(StreamPart::ToolInputEnd {
                id: call.id.clone(),
            });
            parts.push(StreamPart::ToolCall {
                tool_call_id: call.id,
                tool_name: call.name,
                input: call.input,
            });
        }

        log::info!(
            "Session {} finished: reason={:?}, tokens={}/{}/{}",
            self.session_id,
            finish_reason,
            usage.input_tokens,
            usage.output_tokens,
            usage.total_tokens
        );
        parts.push(StreamPart::Finish {
            finish_reason,
            usage,
        });
    }

    fn on_upstream_error(&mut self, err: ErrorEvent, parts: &mut Vec<StreamPart>) {
        let err = StreamError::Upstream {
            message: err
                .message
                .unwrap_or_else(|| "Unknown upstream error".to_string()),
            code: err.code,
            status: err.status,
        };
        log::warn!("Session {}: {}", self.session_id, err);
        parts.push(StreamPart::Error {
            error: err.to_string(),
        });
    }

    /// Put a segment on its channel, switching blocks if needed.
    fn apply_segment(&mut self, segment: Segment, parts: &mut Vec<StreamPart>) {
        if segment.content.is_empty() {
            return;
        }

        let id = match &self.open_block {
            Some(block) if block.kind == segment.kind => block.id.clone(),
            _ => {
                self.close_open_block(parts);
                self.open(segment.kind, parts)
            }
        };
        parts.push(StreamPart::block_delta(segment.kind, id, segment.content));
    }

    /// Open a new block. The caller must have closed any open block.
    fn open(&mut self, kind: SegmentKind, parts: &mut Vec<StreamPart>) -> String {
        let id = (self.next_id)();
        parts.push(StreamPart::block_start(kind, id.clone()));
        self.open_block = Some(OpenBlock {
            kind,
            id: id.clone(),
        });
        self.any_block_opened = true;
        id
    }

    fn close_open_block(&mut self, parts: &mut Vec<StreamPart>) {
        if let Some(block) = self.open_block.take() {
            parts.push(StreamPart::block_end(block.kind, block.id));
        }
    }

    fn stamp(&self, parts: Vec<StreamPart>) -> Vec<StreamEvent> {
        parts
            .into_iter()
            .map(|part| {
                let event = StreamEvent {
                    part,
                    ids: self.ids.clone(),
                };
                if self.tracing {
                    if let Ok(json) = serde_json::to_string(&event) {
                        log_line(&self.trace, "OUT", &json);
                    }
                }
                event
            })
            .collect()
    }
}

// ============================================================================
// TESTS
// ============================================================================
