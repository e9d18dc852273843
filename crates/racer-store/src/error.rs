//! Error types for the store layer.

use racer_protocol::PlayerId;

use crate::PlatformIdentity;

/// Errors raised by the store, the repository, and catalog loading.
///
/// `Validation` is the only variant whose message is meant for the client;
/// everything else is logged and surfaced as an opaque failure.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A pushed value is out of range, of the wrong type, or names something
    /// the catalog does not know. The whole write is rejected.
    #[error("{0}")]
    Validation(String),

    /// No player row exists with this id.
    #[error("player {0} not found")]
    PlayerNotFound(PlayerId),

    /// A player with this platform identity already exists.
    #[error("player {0} already exists")]
    DuplicatePlayer(PlatformIdentity),

    /// A uniqueness rule would be broken (for example a token collision).
    #[error("integrity violation: {0}")]
    Integrity(String),

    /// The timer name is not in the catalog.
    #[error("unknown timer `{0}`")]
    UnknownTimer(String),

    /// Catalog or seed data is inconsistent.
    #[error("invalid catalog: {0}")]
    InvalidCatalog(String),
}
