//! Error types for the protocol layer.
//!
//! Each crate in the workspace defines its own error enum. A `ProtocolError`
//! always means the message itself is at fault (bad bytes, wrong shape, bad
//! signature), never the player's state.

/// Errors that can occur while decoding, encoding, or verifying a message.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes or a value).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// The body is not valid JSON, or is JSON of the wrong shape for the
    /// typed section it was decoded into.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The body parsed, but breaks a protocol rule (for example the top level
    /// is an array instead of a mapping).
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// A required field is missing or unusable.
    #[error("missing parameter: {0}")]
    MissingParameter(&'static str),

    /// The `sig` field does not match the recomputed signature.
    #[error("signature mismatch")]
    BadSignature,
}
