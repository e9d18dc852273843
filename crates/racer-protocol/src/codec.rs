//! Codec trait and the JSON implementation.
//!
//! A "codec" (coder/decoder) converts between Rust types and raw bytes. The
//! dispatcher first decodes a body into a raw mapping (the signature is
//! computed over the raw structure), then narrows that mapping into a typed
//! request with [`Codec::from_object`].

use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use crate::ProtocolError;

/// Converts between Rust types, raw JSON mappings, and bytes.
///
/// `Send + Sync + 'static` because one codec is shared by every request
/// handler for the lifetime of the server.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// [`ProtocolError::Encode`] if the value cannot be represented.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Parses a request body into its top-level mapping.
    ///
    /// # Errors
    /// [`ProtocolError::Decode`] for malformed bytes,
    /// [`ProtocolError::InvalidMessage`] when the top level is not a mapping.
    fn decode_object(
        &self,
        data: &[u8],
    ) -> Result<Map<String, Value>, ProtocolError>;

    /// Narrows an already-parsed mapping into a typed request.
    ///
    /// # Errors
    /// [`ProtocolError::Decode`] if a section has the wrong shape.
    fn from_object<T: DeserializeOwned>(
        &self,
        object: Map<String, Value>,
    ) -> Result<T, ProtocolError>;
}

/// A [`Codec`] backed by `serde_json`.
///
/// ```rust
/// use racer_protocol::{Codec, JsonCodec, PullRequest};
///
/// let codec = JsonCodec;
/// let object = codec.decode_object(br#"{"r":["coins"],"sig":"x"}"#).unwrap();
/// let pull: PullRequest = codec.from_object(object).unwrap();
/// assert_eq!(pull.resources, Some(vec!["coins".to_string()]));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode_object(
        &self,
        data: &[u8],
    ) -> Result<Map<String, Value>, ProtocolError> {
        match serde_json::from_slice(data).map_err(ProtocolError::Decode)? {
            Value::Object(map) => Ok(map),
            _ => Err(ProtocolError::InvalidMessage(
                "top-level JSON value must be an object".into(),
            )),
        }
    }

    fn from_object<T: DeserializeOwned>(
        &self,
        object: Map<String, Value>,
    ) -> Result<T, ProtocolError> {
        serde_json::from_value(Value::Object(object))
            .map_err(ProtocolError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PushRequest;

    #[test]
    fn test_decode_object_rejects_garbage() {
        let result = JsonCodec.decode_object(b"{not json");

        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_decode_object_rejects_non_object() {
        let result = JsonCodec.decode_object(b"[1,2,3]");

        assert!(matches!(result, Err(ProtocolError::InvalidMessage(_))));
    }

    #[test]
    fn test_from_object_wrong_section_shape_is_decode_error() {
        let object = JsonCodec.decode_object(br#"{"r": 5}"#).unwrap();

        let result: Result<PushRequest, _> = JsonCodec.from_object(object);

        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }
}
