//! Error types.
//!
//! Nothing here is fatal to a session. Stream-level errors are turned into
//! `error` stream parts by the coordinator; configuration errors surface at
//! construction time.

use thiserror::Error;

/// An upstream payload that could not be decoded into an [`UpstreamEvent`].
///
/// Produced by whatever validates the raw wire event (see
/// [`crate::upstream::decode_event`]) and handed to the coordinator in place
/// of an event.
///
/// [`UpstreamEvent`]: crate::upstream::UpstreamEvent
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Failed to decode upstream event: {reason}")]
pub struct DecodeError {
    pub reason: String,
    /// The raw payload, when the decoder still had it.
    pub raw: Option<String>,
}

impl DecodeError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            raw: None,
        }
    }

    pub fn with_raw(mut self, raw: impl Into<String>) -> Self {
        self.raw = Some(raw.into());
        self
    }
}

impl From<serde_json::Error> for DecodeError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(err.to_string())
    }
}

/// Errors that reach the output stream as `error` parts.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StreamError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("Upstream error: {}", describe_upstream(.message, .code.as_deref(), .status.as_ref()))]
    Upstream {
        message: String,
        code: Option<String>,
        status: Option<u16>,
    },
}

fn describe_upstream(message: &str, code: Option<&str>, status: Option<&u16>) -> String {
    let mut details = Vec::new();
    if let Some(code) = code.filter(|code| !code.is_empty()) {
        details.push(code.to_string());
    }
    if let Some(status) = status {
        details.push(format!("status {status}"));
    }

    if details.is_empty() {
        message.to_string()
    } else {
        format!("{message} ({})", details.join(", "))
    }
}

/// Invalid [`StreamConfig`](crate::config::StreamConfig).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Tag literal `{0}` must not be empty")]
    EmptyTag(&'static str),
    #[error("Open and close tags must differ, both are `{0}`")]
    IdenticalTags(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_error_from_serde() {
        let err = serde_json::from_str::<serde_json::Value>("{nope").unwrap_err();
        let decode: DecodeError = err.into();
        assert!(decode.reason.contains("key must be a string"));
        assert!(decode.raw.is_none());
    }

    #[test]
    fn decode_error_display() {
        let err = DecodeError::new("missing field `event`").with_raw("{}");
        assert_eq!(
            err.to_string(),
            "Failed to decode upstream event: missing field `event`"
        );
        assert_eq!(err.raw.as_deref(), Some("{}"));
    }

    #[test]
    fn upstream_error_folds_code() {
        let err = StreamError::Upstream {
            message: "quota exceeded".to_string(),
            code: Some("provider_quota_exceeded".to_string()),
            status: None,
        };
        assert_eq!(
            err.to_string(),
            "Upstream error: quota exceeded (provider_quota_exceeded)"
        );
    }

    #[test]
    fn upstream_error_without_code() {
        let err = StreamError::Upstream {
            message: "boom".to_string(),
            code: None,
            status: None,
        };
        assert_eq!(err.to_string(), "Upstream error: boom");
    }

    #[test]
    fn upstream_error_folds_status() {
        let err = StreamError::Upstream {
            message: "Slow down".to_string(),
            code: Some("rate_limit".to_string()),
            status: Some(429),
        };
        assert_eq!(
            err.to_string(),
            "Upstream error: Slow down (rate_limit, status 429)"
        );

        let err = StreamError::Upstream {
            message: "Bad gateway".to_string(),
            code: Some(String::new()),
            status: Some(502),
        };
        assert_eq!(err.to_string(), "Upstream error: Bad gateway (status 502)");
    }

    #[test]
    fn stream_error_wraps_decode_transparently() {
        let err: StreamError = DecodeError::new("bad").into();
        assert_eq!(err.to_string(), "Failed to decode upstream event: bad");
    }
}
