//! Player rows and their owned join rows.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use racer_protocol::PlayerId;
use racer_timer::TimerRun;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Catalog ids
// ---------------------------------------------------------------------------

/// Id of a resource type in the catalog.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ResourceId(pub u32);

/// Id of a costume in the catalog.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct CostumeId(pub u32);

/// Id of a timer kind in the catalog.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TimerId(pub u32);

/// Id of a shop set; listing order follows it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ShopSetId(pub u32);

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

/// Who a player is on the embedding platform. Unique per player.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PlatformIdentity {
    pub platform: String,
    pub platform_id: u64,
}

impl PlatformIdentity {
    pub fn new(platform: impl Into<String>, platform_id: u64) -> Self {
        Self {
            platform: platform.into(),
            platform_id,
        }
    }
}

impl fmt::Display for PlatformIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.platform, self.platform_id)
    }
}

/// The player row. All stamps are epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    pub identity: PlatformIdentity,
    /// Current bearer token, if one was ever issued.
    pub token: Option<String>,
    pub token_expires_ms: i64,
    /// `start_ms - login_ms` of the current session.
    pub session_secret: i64,
    pub registered_ms: i64,
    pub login_ms: i64,
    pub start_ms: i64,
    pub level: u32,
}

impl Player {
    pub(crate) fn new(
        id: PlayerId,
        identity: PlatformIdentity,
        registered_ms: i64,
    ) -> Self {
        Self {
            id,
            identity,
            token: None,
            token_expires_ms: registered_ms,
            session_secret: 0,
            registered_ms,
            login_ms: registered_ms,
            start_ms: 0,
            level: 0,
        }
    }

    /// The session secret in the decimal form used as a signing key.
    pub fn session_secret_key(&self) -> String {
        self.session_secret.to_string()
    }
}

/// A player row together with every join row it owns.
///
/// Map keys enforce "at most one row per (player, X)". Holding the record's
/// lock is holding the row lock on the player and all of its join rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerRecord {
    pub player: Player,
    /// Resource counts. A missing key reads as 0.
    pub resources: BTreeMap<ResourceId, u64>,
    /// Owned costumes. Presence means owned.
    pub costumes: BTreeSet<CostumeId>,
    /// Running timers. Expired timers are removed, never stored.
    pub timers: BTreeMap<TimerId, TimerRun>,
}

impl PlayerRecord {
    pub(crate) fn new(player: Player) -> Self {
        Self {
            player,
            resources: BTreeMap::new(),
            costumes: BTreeSet::new(),
            timers: BTreeMap::new(),
        }
    }
}
