//! Unified error type for the racer server.

use axum::http::StatusCode;
use racer_protocol::{ErrorCode, ProtocolError};
use racer_session::SessionError;
use racer_store::StoreError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically. The
/// dispatcher turns any of them into a wire failure with
/// [`error_code`](Self::error_code) and [`status`](Self::status).
#[derive(Debug, thiserror::Error)]
pub enum RacerError {
    /// A protocol-level error (content, shape, signature).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (platform proof, token).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A store-level error (validation, integrity, catalog).
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The request body is not declared as `application/json`.
    #[error("request is not application/json")]
    NotJson,

    /// The path token is missing, malformed, unknown, or expired.
    #[error("no live session for this token")]
    Unauthorized,

    /// Binding, serving, or reading configuration failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RacerError {
    /// The stable code sent in `errorCode`.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::NotJson => ErrorCode::NotJson,
            Self::Protocol(ProtocolError::Decode(_) | ProtocolError::InvalidMessage(_)) => {
                ErrorCode::MalformedJson
            }
            Self::Protocol(ProtocolError::MissingParameter(_)) => {
                ErrorCode::InsufficientParameters
            }
            Self::Store(e) | Self::Session(SessionError::Store(e)) => store_code(e),
            _ => ErrorCode::Unrecognized,
        }
    }

    /// The HTTP status of the failure reply.
    ///
    /// Validation failures are ordinary replies (200 with `isSuccess: 0`);
    /// auth failures are 401 whichever check tripped.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotJson => StatusCode::BAD_REQUEST,
            Self::Protocol(ProtocolError::BadSignature) => StatusCode::UNAUTHORIZED,
            Self::Protocol(ProtocolError::Encode(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Protocol(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Store(e) | Self::Session(SessionError::Store(e)) => store_status(e),
            Self::Session(_) => StatusCode::UNAUTHORIZED,
            Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the client may see this error's message. Only validation
    /// messages are written for players; everything else stays in the logs.
    pub fn is_client_facing(&self) -> bool {
        matches!(
            self,
            Self::Store(StoreError::Validation(_))
                | Self::Session(SessionError::Store(StoreError::Validation(_)))
        )
    }
}

fn store_code(e: &StoreError) -> ErrorCode {
    match e {
        StoreError::Validation(_) => ErrorCode::Validation,
        StoreError::DuplicatePlayer(_) => ErrorCode::DuplicatePlayer,
        _ => ErrorCode::Unrecognized,
    }
}

fn store_status(e: &StoreError) -> StatusCode {
    match e {
        StoreError::Validation(_) => StatusCode::OK,
        StoreError::DuplicatePlayer(_) => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use racer_protocol::PlayerId;

    use super::*;

    fn decode_error() -> serde_json::Error {
        serde_json::from_str::<serde_json::Value>("{").unwrap_err()
    }

    #[test]
    fn test_from_protocol_error() {
        let err: RacerError = ProtocolError::InvalidMessage("bad".into()).into();
        assert!(matches!(err, RacerError::Protocol(_)));
        assert_eq!(err.error_code(), ErrorCode::MalformedJson);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_from_session_error() {
        let err: RacerError = SessionError::AuthFailed("nope".into()).into();
        assert!(matches!(err, RacerError::Session(_)));
        assert_eq!(err.error_code(), ErrorCode::Unrecognized);
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_from_store_error() {
        let err: RacerError = StoreError::Validation("too big".into()).into();
        assert!(matches!(err, RacerError::Store(_)));
        assert_eq!(err.error_code(), ErrorCode::Validation);
        assert_eq!(err.status(), StatusCode::OK);
        assert!(err.is_client_facing());
        assert_eq!(err.to_string(), "too big");
    }

    #[test]
    fn test_decode_error_is_code_2() {
        let err: RacerError = ProtocolError::Decode(decode_error()).into();
        assert_eq!(err.error_code().code(), 2);
    }

    #[test]
    fn test_missing_parameter_is_code_3() {
        let err: RacerError = ProtocolError::MissingParameter("action").into();
        assert_eq!(err.error_code().code(), 3);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_not_json_is_code_1() {
        assert_eq!(RacerError::NotJson.error_code().code(), 1);
        assert_eq!(RacerError::NotJson.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_bad_signature_and_unauthorized_are_401() {
        let bad_sig: RacerError = ProtocolError::BadSignature.into();
        assert_eq!(bad_sig.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(RacerError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_internal_store_errors_are_opaque_500() {
        let err: RacerError = StoreError::PlayerNotFound(PlayerId(3)).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.error_code(), ErrorCode::Unrecognized);
        assert!(!err.is_client_facing());
    }

    #[test]
    fn test_duplicate_player_is_code_101() {
        let identity = racer_store::PlatformIdentity::new("vk.com", 1);
        let err: RacerError = StoreError::DuplicatePlayer(identity).into();
        assert_eq!(err.error_code().code(), 101);
    }
}
