//! Session types: token lifetime settings and the authenticated context a
//! bearer token resolves to.

use racer_protocol::PlayerId;

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for bearer tokens.
///
/// Defaults: tokens live for an hour, and a token with at most a minute
/// left is replaced rather than handed out again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// How long a freshly issued token stays valid, in seconds.
    pub token_ttl_secs: u64,

    /// A token is reused only while it has more than this many seconds left.
    pub renew_margin_secs: u64,
}

impl SessionConfig {
    pub(crate) fn token_ttl_ms(&self) -> i64 {
        secs_to_ms(self.token_ttl_secs)
    }

    pub(crate) fn renew_margin_ms(&self) -> i64 {
        secs_to_ms(self.renew_margin_secs)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            token_ttl_secs: 3_600,
            renew_margin_secs: 60,
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// What a live bearer token resolves to: the player and the secret that
/// signs this session's requests and replies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub player_id: PlayerId,

    /// `start_ms - login_ms` of the current login, in decimal.
    pub secret: String,
}

/// The result of a successful `/start`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartedSession {
    pub player_id: PlayerId,
    /// The bearer token, reused or freshly issued.
    pub token: String,
    /// Session start, in epoch milliseconds.
    pub start_ms: i64,
    /// The new session secret, in decimal.
    pub secret: String,
}

fn secs_to_ms(secs: u64) -> i64 {
    i64::try_from(secs).unwrap_or(i64::MAX).saturating_mul(1_000)
}
