//! Incremental reasoning-tag lexer.
//!
//! Splits an answer that arrives in arbitrary chunks into alternating plain
//! and reasoning segments, delimited by a pair of tag literals
//! (`<think>` / `</think>` by default).
//!
//! # How This Lexer Works
//!
//! Text is scanned one character at a time. The lexer is always in one of
//! four states:
//!
//! ```text
//!            open tag complete                  close tag complete
//!   Plain ──> OpenCandidate ──> Reasoning ──> CloseCandidate ──> Plain
//!     ^            │                ^               │
//!     └── broken ──┘                └─── broken ────┘
//! ```
//!
//! While a candidate is being matched, the characters are held in `pending`
//! instead of being emitted. That buffer survives between `feed` calls, so a
//! tag split across two chunks (`"<thi"` + `"nk>"`) is still recognized.
//!
//! Two rules keep tool-call JSON in the answer from being misread as markup:
//!
//! - Inside a double-quoted string no tags are scanned at all.
//! - Only one reasoning block is recognized. After it closes, another
//!   opening tag is ordinary text.

use serde::Serialize;

use crate::config::{StreamConfig, DEFAULT_CLOSE_TAG, DEFAULT_OPEN_TAG};

/// Which channel a segment belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    Plain,
    Reasoning,
}

/// A classified run of characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub kind: SegmentKind,
    pub content: String,
}

impl Segment {
    pub fn plain(content: impl Into<String>) -> Self {
        Self {
            kind: SegmentKind::Plain,
            content: content.into(),
        }
    }

    pub fn reasoning(content: impl Into<String>) -> Self {
        Self {
            kind: SegmentKind::Reasoning,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum LexerState {
    #[default]
    Plain,
    /// Matching a prefix of the open tag.
    OpenCandidate,
    Reasoning,
    /// Matching a prefix of the close tag.
    CloseCandidate,
}

impl LexerState {
    /// The channel characters go to while in this state.
    fn kind(self) -> SegmentKind {
        match self {
            LexerState::Plain | LexerState::OpenCandidate => SegmentKind::Plain,
            LexerState::Reasoning | LexerState::CloseCandidate => SegmentKind::Reasoning,
        }
    }
}

/// Flags that ride alongside the primary state.
#[derive(Debug, Default)]
struct ScanFlags {
    /// The one reasoning block has already closed.
    closed_once: bool,
    /// Inside a `"..."` string; tag scanning is suspended.
    in_string: bool,
    /// Previous character was a backslash inside a string.
    escaped: bool,
    /// Some non-whitespace character has been seen.
    seen_content: bool,
}

/// Incremental lexer for one answer stream.
///
/// Owned by exactly one [`StreamCoordinator`](crate::coordinator::StreamCoordinator).
#[derive(Debug)]
pub struct TagLexer {
    open_tag: String,
    close_tag: String,
    state: LexerState,
    /// Characters held back while a tag candidate is being matched.
    pending: String,
    flags: ScanFlags,
    /// Every plain segment emitted so far, untrimmed.
    accumulated: String,
}

impl Default for TagLexer {
    fn default() -> Self {
        Self::new(DEFAULT_OPEN_TAG, DEFAULT_CLOSE_TAG)
    }
}

impl TagLexer {
    /// Create a lexer for the given tag pair.
    ///
    /// Tags are expected to be non-empty; [`StreamConfig::validate`] checks
    /// this for configured lexers.
    pub fn new(open_tag: impl Into<String>, close_tag: impl Into<String>) -> Self {
        Self {
            open_tag: open_tag.into(),
            close_tag: close_tag.into(),
            state: LexerState::default(),
            pending: String::new(),
            flags: ScanFlags::default(),
            accumulated: String::new(),
        }
    }

    pub fn from_config(config: &StreamConfig) -> Self {
        Self::new(config.open_tag.clone(), config.close_tag.clone())
    }

    /// Feed a chunk and collect the segments it completes.
    ///
    /// Adjacent segments of the same kind are merged, so a single call never
    /// returns two plain (or two reasoning) segments in a row. Characters of
    /// an unfinished tag candidate are held back until a later call decides
    /// what they are.
    pub fn feed(&mut self, chunk: &str) -> Vec<Segment> {
        let mut segments = Vec::new();
        for c in chunk.chars() {
            self.scan(c, &mut segments);
        }
        self.accumulate(&segments);
        segments
    }

    /// Drain a held-back tag candidate as a best-effort segment.
    ///
    /// A half-matched close tag is still reasoning text; anything else is
    /// plain. Returns nothing when no candidate is pending.
    pub fn flush(&mut self) -> Vec<Segment> {
        if self.pending.is_empty() {
            return Vec::new();
        }

        let kind = self.state.kind();
        self.state = match kind {
            SegmentKind::Plain => LexerState::Plain,
            SegmentKind::Reasoning => LexerState::Reasoning,
        };
        let segments = vec![Segment {
            kind,
            content: std::mem::take(&mut self.pending),
        }];
        self.accumulate(&segments);
        segments
    }

    /// Forget everything and lex `full_text` as if it were the first chunk.
    pub fn reset(&mut self, full_text: &str) -> Vec<Segment> {
        self.state = LexerState::default();
        self.pending.clear();
        self.flags = ScanFlags::default();
        self.accumulated.clear();
        self.feed(full_text)
    }

    /// All plain text emitted so far, trimmed.
    ///
    /// Reasoning content and tag delimiters are not included (except for
    /// delimiters that ended up as plain text, such as a second opening tag).
    pub fn accumulated_plain_text(&self) -> String {
        self.accumulated.trim().to_string()
    }

    /// True while a tag candidate is held back.
    pub fn is_buffering(&self) -> bool {
        !self.pending.is_empty()
    }

    fn scan(&mut self, c: char, out: &mut Vec<Segment>) {
        // Leading whitespace of the whole stream is dropped.
        if !self.flags.seen_content {
            if c.is_whitespace() {
                return;
            }
            self.flags.seen_content = true;
        }

        if self.flags.in_string {
            if self.flags.escaped {
                self.flags.escaped = false;
            } else if c == '\\' {
                self.flags.escaped = true;
            } else if c == '"' {
                self.flags.in_string = false;
            }
            push_char(out, self.state.kind(), c);
            return;
        }

        match self.state {
            LexerState::Plain | LexerState::Reasoning => self.scan_outside_tag(c, out),
            LexerState::OpenCandidate | LexerState::CloseCandidate => {
                self.scan_candidate(c, out)
            }
        }
    }

    fn scan_outside_tag(&mut self, c: char, out: &mut Vec<Segment>) {
        let kind = self.state.kind();

        if c == '"' {
            self.flags.in_string = true;
            push_char(out, kind, c);
            return;
        }

        let starts_tag = match self.state {
            LexerState::Plain => !self.flags.closed_once && self.open_tag.starts_with(c),
            _ => self.close_tag.starts_with(c),
        };
        if !starts_tag {
            push_char(out, kind, c);
            return;
        }

        self.state = match kind {
            SegmentKind::Plain => LexerState::OpenCandidate,
            SegmentKind::Reasoning => LexerState::CloseCandidate,
        };
        self.pending.push(c);
        if self.pending.len() == self.candidate_tag().len() {
            self.complete_tag();
        }
    }

    fn scan_candidate(&mut self, c: char, out: &mut Vec<Segment>) {
        self.pending.push(c);

        let tag = self.candidate_tag();
        let is_prefix = tag.starts_with(self.pending.as_str());
        let is_complete = is_prefix && tag.len() == self.pending.len();

        if is_complete {
            self.complete_tag();
            return;
        }
        if is_prefix {
            return;
        }

        // Not a tag after all. Release what was held back and look at the
        // current character again from the base state.
        self.pending.pop();
        let kind = self.state.kind();
        push_str(out, kind, &std::mem::take(&mut self.pending));
        self.state = match kind {
            SegmentKind::Plain => LexerState::Plain,
            SegmentKind::Reasoning => LexerState::Reasoning,
        };
        self.scan_outside_tag(c, out);
    }

    fn candidate_tag(&self) -> &str {
        match self.state {
            LexerState::OpenCandidate => &self.open_tag,
            _ => &self.close_tag,
        }
    }

    fn complete_tag(&mut self) {
        self.pending.clear();
        self.state = match self.state {
            LexerState::OpenCandidate => LexerState::Reasoning,
            _ => {
                self.flags.closed_once = true;
                LexerState::Plain
            }
        };
    }

    fn accumulate(&mut self, segments: &[Segment]) {
        for segment in segments {
            if segment.kind == SegmentKind::Plain {
                self.accumulated.push_str(&segment.content);
            }
        }
    }
}

fn push_char(out: &mut Vec<Segment>, kind: SegmentKind, c: char) {
    match out.last_mut() {
        Some(last) if last.kind == kind => last.content.push(c),
        _ => out.push(Segment {
            kind,
            content: c.to_string(),
        }),
    }
}

fn push_str(out: &mut Vec<Segment>, kind: SegmentKind, s: &str) {
    if s.is_empty() {
        return;
    }
    match out.last_mut() {
        Some(last) if last.kind == kind => last.content.push_str(s),
        _ => out.push(Segment {
            kind,
            content: s.to_string(),
        }),
    }
}
