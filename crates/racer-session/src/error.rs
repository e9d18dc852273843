//! Error types for the session layer.

use racer_store::{PlatformIdentity, StoreError};

/// Errors that can occur while admitting a player or managing their token.
///
/// The variants exist for logs. Clients see one undifferentiated auth
/// failure, so a caller probing with forged proofs learns nothing about
/// which check tripped.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The platform proof (launch signature, auth key, or platform id) was
    /// rejected, or the app secret is not configured.
    #[error("platform proof rejected: {0}")]
    AuthFailed(String),

    /// The request names a platform this server does not verify.
    #[error("unsupported platform `{0}`")]
    UnsupportedPlatform(String),

    /// The proof is valid but nobody with this identity has entered the
    /// game yet. Sessions never create players.
    #[error("no player registered as {0}")]
    PlayerNotFound(PlatformIdentity),

    /// The bearer token is unknown, malformed, revoked, or expired.
    #[error("unknown or expired token")]
    InvalidToken,

    /// The store failed underneath a session operation.
    #[error(transparent)]
    Store(#[from] StoreError),
}
