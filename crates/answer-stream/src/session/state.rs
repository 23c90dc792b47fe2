//! Per-session identity.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::upstream::EventIds;

/// Unique identifier for a streaming session.
///
/// Local to this process; names the trace log file. Not related to the
/// upstream `conversation_id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Upstream identifiers seen so far in a session.
///
/// Every upstream event may carry any of these. The most recent non-empty
/// value wins; nothing checks that they stay consistent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Identifiers {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
}

impl Identifiers {
    /// Overwrite each field for which `ids` has a non-empty value.
    pub fn absorb(&mut self, ids: &EventIds) {
        overwrite(&mut self.conversation_id, ids.conversation_id.as_deref());
        overwrite(&mut self.message_id, ids.message_id.as_deref());
        overwrite(&mut self.task_id, ids.task_id.as_deref());
    }
}

fn overwrite(slot: &mut Option<String>, value: Option<&str>) {
    if let Some(value) = value.filter(|v| !v.is_empty()) {
        *slot = Some(value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod session_id {
        use super::*;

        #[test]
        fn new_generates_unique_ids() {
            let id1 = SessionId::new();
            let id2 = SessionId::new();
            assert_ne!(id1, id2);
        }

        #[test]
        fn display_shows_inner_string() {
            let id = SessionId("test-session-123".to_string());
            assert_eq!(format!("{}", id), "test-session-123");
        }

        #[test]
        fn serialization_roundtrip() {
            let id = SessionId("test-session-456".to_string());
            let json = serde_json::to_string(&id).unwrap();
            let deserialized: SessionId = serde_json::from_str(&json).unwrap();
            assert_eq!(id, deserialized);
        }
    }

    mod identifiers {
        use super::*;

        fn ids(conversation: Option<&str>, message: Option<&str>, task: Option<&str>) -> EventIds {
            EventIds {
                conversation_id: conversation.map(str::to_string),
                message_id: message.map(str::to_string),
                task_id: task.map(str::to_string),
            }
        }

        #[test]
        fn last_write_wins() {
            let mut known = Identifiers::default();
            known.absorb(&ids(Some("c1"), Some("m1"), Some("t1")));
            known.absorb(&ids(Some("c2"), None, None));

            assert_eq!(known.conversation_id.as_deref(), Some("c2"));
            assert_eq!(known.message_id.as_deref(), Some("m1"));
            assert_eq!(known.task_id.as_deref(), Some("t1"));
        }

        #[test]
        fn empty_values_do_not_overwrite() {
            let mut known = Identifiers::default();
            known.absorb(&ids(Some("c1"), None, None));
            known.absorb(&ids(Some(""), Some(""), None));

            assert_eq!(known.conversation_id.as_deref(), Some("c1"));
            assert!(known.message_id.is_none());
        }

        #[test]
        fn serializes_camel_case_and_skips_unknown() {
            let mut known = Identifiers::default();
            known.absorb(&ids(Some("c1"), None, Some("t1")));
            let json = serde_json::to_string(&known).unwrap();
            assert_eq!(json, r#"{"conversationId":"c1","taskId":"t1"}"#);
        }
    }
}
