//! The player store: rows, row locks, and the identity and token indexes.
//!
//! # Concurrency
//!
//! Each player record sits behind its own `tokio::sync::Mutex`. Holding that
//! guard is the row lock: any read-modify-write of a player's level,
//! resources, costumes, timers, or token happens while it is held, so two
//! requests for the same player serialize instead of interleaving. Requests
//! for different players never contend.
//!
//! Player creation serializes on the identity index instead. The index lock
//! is held across "look up (platform, platform_id), insert if absent", so a
//! double-loaded game client cannot create two rows for one person.
//!
//! Lock order is identity index → player → token index. Nothing takes them
//! in the other direction.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use racer_protocol::PlayerId;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::{Catalog, PlatformIdentity, Player, PlayerRecord, StoreError};

/// Result of a game-client entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnteredPlayer {
    pub player_id: PlayerId,
    pub login_ms: i64,
    /// `true` if this entry registered the player.
    pub created: bool,
}

/// In-memory backing store for players and their join rows.
pub struct Store {
    /// Player records, each behind its own row lock.
    players: RwLock<HashMap<PlayerId, Arc<Mutex<PlayerRecord>>>>,

    /// (platform, platform_id) → player. Its mutex doubles as the creation
    /// lock.
    identities: Mutex<HashMap<PlatformIdentity, PlayerId>>,

    /// Current bearer token → player. Kept in sync by [`reindex_token`]
    /// under the owning player's row lock.
    ///
    /// [`reindex_token`]: Store::reindex_token
    tokens: RwLock<HashMap<String, PlayerId>>,

    next_id: AtomicU64,
}

impl Store {
    pub fn new() -> Self {
        Self {
            players: RwLock::new(HashMap::new()),
            identities: Mutex::new(HashMap::new()),
            tokens: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Registers a new player and seeds it from the catalog.
    ///
    /// # Errors
    /// [`StoreError::DuplicatePlayer`] if the identity is already registered.
    pub async fn create_player(
        &self,
        identity: PlatformIdentity,
        now_ms: i64,
        catalog: &dyn Catalog,
    ) -> Result<PlayerId, StoreError> {
        let mut identities = self.identities.lock().await;
        if identities.contains_key(&identity) {
            return Err(StoreError::DuplicatePlayer(identity));
        }
        Ok(self
            .insert_player(&mut identities, identity, now_ms, catalog)
            .await)
    }

    /// Finds or creates the player for `identity` and records a login at
    /// `now_ms`.
    ///
    /// # Errors
    /// [`StoreError::PlayerNotFound`] if the index points at a missing row,
    /// which means the store is corrupt.
    pub async fn enter_game(
        &self,
        identity: PlatformIdentity,
        now_ms: i64,
        catalog: &dyn Catalog,
    ) -> Result<EnteredPlayer, StoreError> {
        let mut identities = self.identities.lock().await;

        let (player_id, created) = match identities.get(&identity).copied() {
            Some(id) => (id, false),
            None => {
                tracing::info!(%identity, "new player, registering");
                let id = self
                    .insert_player(&mut identities, identity, now_ms, catalog)
                    .await;
                (id, true)
            }
        };

        let mut record = self
            .lock(player_id)
            .await
            .ok_or(StoreError::PlayerNotFound(player_id))?;
        record.player.login_ms = now_ms;

        Ok(EnteredPlayer {
            player_id,
            login_ms: now_ms,
            created,
        })
    }

    /// Inserts the row and its seeded join rows. The caller holds the
    /// identity lock and has checked the identity is free.
    async fn insert_player(
        &self,
        identities: &mut HashMap<PlatformIdentity, PlayerId>,
        identity: PlatformIdentity,
        now_ms: i64,
        catalog: &dyn Catalog,
    ) -> PlayerId {
        let player_id = PlayerId(self.next_id.fetch_add(1, Ordering::Relaxed));

        let mut record =
            PlayerRecord::new(Player::new(player_id, identity.clone(), now_ms));
        for initial in catalog.initial_resources() {
            record.resources.insert(initial.resource, initial.count);
        }
        for &costume in catalog.initial_costumes() {
            record.costumes.insert(costume);
        }

        self.players
            .write()
            .await
            .insert(player_id, Arc::new(Mutex::new(record)));
        identities.insert(identity.clone(), player_id);

        tracing::info!(%player_id, %identity, "player created");
        player_id
    }

    /// Looks up a player by platform identity. Never creates one.
    pub async fn find_by_identity(
        &self,
        identity: &PlatformIdentity,
    ) -> Option<PlayerId> {
        self.identities.lock().await.get(identity).copied()
    }

    /// Acquires the row lock of a player.
    ///
    /// Returns `None` if the player does not exist. The guard is owned, so it
    /// can be held across `.await` points for the whole unit of work.
    pub async fn lock(
        &self,
        player_id: PlayerId,
    ) -> Option<OwnedMutexGuard<PlayerRecord>> {
        let cell = self.players.read().await.get(&player_id).cloned()?;
        Some(cell.lock_owned().await)
    }

    /// Returns the player a token was last issued to, without checking
    /// expiry. Expiry lives on the player row.
    pub async fn player_for_token(&self, token: &str) -> Option<PlayerId> {
        self.tokens.read().await.get(token).copied()
    }

    /// Points `new` at `player_id` and forgets `old`.
    ///
    /// Call while holding the player's row lock.
    ///
    /// # Errors
    /// [`StoreError::Integrity`] if `new` already belongs to another player.
    pub async fn reindex_token(
        &self,
        player_id: PlayerId,
        old: Option<&str>,
        new: &str,
    ) -> Result<(), StoreError> {
        let mut tokens = self.tokens.write().await;

        if let Some(&owner) = tokens.get(new) {
            if owner != player_id {
                return Err(StoreError::Integrity(format!(
                    "token already issued to {owner}"
                )));
            }
        }
        if let Some(old) = old {
            if tokens.get(old) == Some(&player_id) {
                tokens.remove(old);
            }
        }
        tokens.insert(new.to_string(), player_id);
        Ok(())
    }

    /// Returns the number of registered players.
    pub async fn player_count(&self) -> usize {
        self.players.read().await.len()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CatalogSeed, StaticCatalog};

    fn catalog() -> StaticCatalog {
        StaticCatalog::from_seed(CatalogSeed::builtin()).unwrap()
    }

    fn vk(id: u64) -> PlatformIdentity {
        PlatformIdentity::new("vk.com", id)
    }

    #[tokio::test]
    async fn test_create_player_seeds_initial_rows() {
        let store = Store::new();
        let catalog = catalog();

        let id = store.create_player(vk(1), 500, &catalog).await.unwrap();

        let record = store.lock(id).await.unwrap();
        let coins = catalog.resource_id("coins").unwrap();
        let classic = catalog.costume_id("classic").unwrap();
        assert_eq!(record.resources.get(&coins), Some(&1_000));
        assert!(record.costumes.contains(&classic));
        assert_eq!(record.player.registered_ms, 500);
        assert_eq!(record.player.level, 0);
        assert!(record.player.token.is_none());
    }

    #[tokio::test]
    async fn test_create_player_twice_is_duplicate() {
        let store = Store::new();
        let catalog = catalog();
        store.create_player(vk(1), 0, &catalog).await.unwrap();

        let result = store.create_player(vk(1), 0, &catalog).await;

        assert!(matches!(result, Err(StoreError::DuplicatePlayer(_))));
        assert_eq!(store.player_count().await, 1);
    }

    #[tokio::test]
    async fn test_enter_game_creates_once_and_updates_login() {
        let store = Store::new();
        let catalog = catalog();

        let first = store.enter_game(vk(9), 100, &catalog).await.unwrap();
        let second = store.enter_game(vk(9), 200, &catalog).await.unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.player_id, second.player_id);
        let record = store.lock(first.player_id).await.unwrap();
        assert_eq!(record.player.login_ms, 200);
        assert_eq!(record.player.registered_ms, 100);
    }

    #[tokio::test]
    async fn test_find_by_identity_never_creates() {
        let store = Store::new();

        assert_eq!(store.find_by_identity(&vk(3)).await, None);
        assert_eq!(store.player_count().await, 0);
    }

    #[tokio::test]
    async fn test_lock_unknown_player_is_none() {
        let store = Store::new();

        assert!(store.lock(PlayerId(42)).await.is_none());
    }

    #[tokio::test]
    async fn test_reindex_token_moves_token() {
        let store = Store::new();
        let id = PlayerId(1);

        store.reindex_token(id, None, "a").await.unwrap();
        store.reindex_token(id, Some("a"), "b").await.unwrap();

        assert_eq!(store.player_for_token("a").await, None);
        assert_eq!(store.player_for_token("b").await, Some(id));
    }

    #[tokio::test]
    async fn test_reindex_token_collision_is_integrity_error() {
        let store = Store::new();
        store.reindex_token(PlayerId(1), None, "same").await.unwrap();

        let result = store.reindex_token(PlayerId(2), None, "same").await;

        assert!(matches!(result, Err(StoreError::Integrity(_))));
        assert_eq!(store.player_for_token("same").await, Some(PlayerId(1)));
    }
}
