//! Upstream event model.
//!
//! Decoding raw payloads is normally the transport's job; [`decode_event`]
//! is provided for callers that hold the JSON text of each event.

mod types;

pub use types::*;

use serde::Deserialize;
use serde_json::Value;

use crate::error::DecodeError;

/// The discriminator and identifiers, read before the payload.
#[derive(Deserialize)]
struct Envelope {
    event: String,
    #[serde(flatten)]
    ids: EventIds,
}

/// Decode one upstream event from its JSON text.
///
/// Unknown `event` kinds decode to [`UpstreamEvent::Unknown`] with their
/// identifiers; malformed JSON or a known kind with the wrong field types is
/// a [`DecodeError`] carrying the raw text.
pub fn decode_event(raw: &str) -> Result<UpstreamEvent, DecodeError> {
    decode_value(raw.trim()).map_err(|err| DecodeError::from(err).with_raw(raw))
}

fn decode_value(raw: &str) -> Result<UpstreamEvent, serde_json::Error> {
    let value: Value = serde_json::from_str(raw)?;
    let envelope = Envelope::deserialize(&value)?;
    if !KNOWN_KINDS.contains(&envelope.event.as_str()) {
        return Ok(UpstreamEvent::Unknown(envelope.ids));
    }
    UpstreamEvent::deserialize(value)
}
