//! Session configuration.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_OPEN_TAG: &str = "<think>";
pub const DEFAULT_CLOSE_TAG: &str = "</think>";

/// What [`StreamCoordinator::finish_aborted`] does when the upstream feed ends
/// without a terminal event.
///
/// [`StreamCoordinator::finish_aborted`]: crate::coordinator::StreamCoordinator::finish_aborted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AbortPolicy {
    /// Emit nothing. Open blocks stay open and buffered tag text is dropped.
    #[default]
    Lenient,
    /// Flush the lexer and close whichever block is open. No finish part.
    CloseOpenBlocks,
}

/// Configuration for one streaming session.
///
/// All fields have defaults, so a settings file only needs the keys it
/// overrides:
///
/// ```json
/// { "openTag": "<reasoning>", "closeTag": "</reasoning>", "abortPolicy": "closeOpenBlocks" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StreamConfig {
    /// Literal that opens the reasoning block.
    pub open_tag: String,
    /// Literal that closes the reasoning block.
    pub close_tag: String,
    pub abort_policy: AbortPolicy,
    /// Directory for per-session trace logs. `None` disables tracing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_log_dir: Option<String>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            open_tag: DEFAULT_OPEN_TAG.to_string(),
            close_tag: DEFAULT_CLOSE_TAG.to_string(),
            abort_policy: AbortPolicy::default(),
            trace_log_dir: None,
        }
    }
}

impl StreamConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.open_tag.is_empty() {
            return Err(ConfigError::EmptyTag("openTag"));
        }
        if self.close_tag.is_empty() {
            return Err(ConfigError::EmptyTag("closeTag"));
        }
        if self.open_tag == self.close_tag {
            return Err(ConfigError::IdenticalTags(self.open_tag.clone()));
        }
        Ok(())
    }
}
