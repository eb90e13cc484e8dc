//! Payload decoding — JSON parsing plus schema validation.
//!
//! Decoding is total: every payload yields either a command batch or a
//! [`DecodeError`], never a panic. The two error variants carry the
//! canonical user-facing messages; the underlying `serde_json` error is
//! retained as the source for logging.

use crate::model::Command;

/// Why a payload was rejected.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The payload body failed to parse as JSON at all.
    #[error("input was not valid JSON")]
    InvalidJson(#[source] serde_json::Error),
    /// The payload parsed as JSON but did not match the expected shape:
    /// an array of commands with typed pane content.
    #[error("command JSON did not match expected format")]
    Shape(#[source] serde_json::Error),
}

/// Decode one payload body as a JSON array of [`Command`]s.
///
/// A shape failure rejects the whole payload — there is no partial
/// acceptance of a malformed array.
pub fn decode_commands(payload: &str) -> Result<Vec<Command>, DecodeError> {
    let value: serde_json::Value =
        serde_json::from_str(payload).map_err(DecodeError::InvalidJson)?;
    serde_json::from_value(value).map_err(DecodeError::Shape)
}
