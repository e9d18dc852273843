//! The session manager: admits players and owns their bearer tokens.
//!
//! It is responsible for:
//! - Game-client entry: verifying launch parameters and registering the
//!   player on first contact
//! - `/start`: verifying the start proof, issuing (or reusing) a token, and
//!   deriving the session secret
//! - Resolving, renewing, and revoking tokens
//!
//! # Concurrency note
//!
//! Token state lives on the player row, so every mutation here runs under
//! that player's row lock (see [`racer_store::Store::lock`]). The token
//! index is only a lookup aid; [`SessionManager::resolve`] re-checks the row,
//! which is authoritative.

use std::collections::BTreeMap;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use racer_protocol::{PlayerId, StartRequest};
use racer_store::{Catalog, EnteredPlayer, PlatformIdentity, PlayerRecord, Store, StoreError};
use racer_timer::Clock;
use rand::Rng;

use crate::{PlatformVerifier, Session, SessionConfig, SessionError, StartedSession};

/// Admits players and manages their tokens.
///
/// ## Lifecycle
///
/// ```text
/// enter() ──→ start() ──→ resolve() on every request
///  │            │
///  │            ├─ token reused while > margin left
///  │            └─ token replaced otherwise
///  ▼
/// [player row, login_ms]      revoke() ──→ resolve() = None
/// ```
pub struct SessionManager {
    store: Arc<Store>,
    catalog: Arc<dyn Catalog>,
    verifier: Arc<dyn PlatformVerifier>,
    clock: Arc<dyn Clock>,
    config: SessionConfig,
}

impl SessionManager {
    pub fn new(
        store: Arc<Store>,
        catalog: Arc<dyn Catalog>,
        verifier: Arc<dyn PlatformVerifier>,
        clock: Arc<dyn Clock>,
        config: SessionConfig,
    ) -> Self {
        Self {
            store,
            catalog,
            verifier,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The platform this manager admits players from.
    pub fn platform(&self) -> &str {
        self.verifier.platform()
    }

    /// Game-client entry: verifies the launch and records a login.
    ///
    /// Registers the player (seeded from the catalog) on first contact.
    ///
    /// # Errors
    /// [`SessionError::AuthFailed`] if the launch parameters are rejected.
    /// The store is not touched in that case.
    pub async fn enter(
        &self,
        launch: &BTreeMap<String, String>,
    ) -> Result<EnteredPlayer, SessionError> {
        let platform_id = self.verifier.verify_launch(launch).inspect_err(|e| {
            tracing::warn!(error = %e, "game-client launch rejected");
        })?;

        let identity = PlatformIdentity::new(self.verifier.platform(), platform_id);
        let entered = self
            .store
            .enter_game(identity, self.clock.now_ms(), self.catalog.as_ref())
            .await?;

        tracing::info!(
            player_id = %entered.player_id,
            created = entered.created,
            "player entered game"
        );
        Ok(entered)
    }

    /// Starts a session for an already registered player.
    ///
    /// Sets `start_ms = now`, derives the session secret as
    /// `start_ms - login_ms`, and returns a bearer token.
    ///
    /// # Errors
    /// - [`SessionError::UnsupportedPlatform`]: wrong platform name
    /// - [`SessionError::AuthFailed`]: proof rejected
    /// - [`SessionError::PlayerNotFound`]: valid proof, but the player never
    ///   entered the game
    pub async fn start(&self, request: &StartRequest) -> Result<StartedSession, SessionError> {
        if request.platform != self.verifier.platform() {
            tracing::warn!(platform = %request.platform, "start from unsupported platform");
            return Err(SessionError::UnsupportedPlatform(request.platform.clone()));
        }
        let platform_id = self.verifier.verify_start(request).inspect_err(|e| {
            tracing::warn!(error = %e, "start proof rejected");
        })?;

        let identity = PlatformIdentity::new(self.verifier.platform(), platform_id);
        let Some(player_id) = self.store.find_by_identity(&identity).await else {
            tracing::warn!(%identity, "start for unregistered player");
            return Err(SessionError::PlayerNotFound(identity));
        };

        let mut record = self
            .store
            .lock(player_id)
            .await
            .ok_or(StoreError::PlayerNotFound(player_id))?;
        let now_ms = self.clock.now_ms();
        let token = self.issue_locked(&mut record, now_ms).await?;
        record.player.start_ms = now_ms;
        record.player.session_secret = now_ms.saturating_sub(record.player.login_ms);

        tracing::info!(%player_id, "session started");
        Ok(StartedSession {
            player_id,
            token,
            start_ms: now_ms,
            secret: record.player.session_secret_key(),
        })
    }

    /// Returns the player's token, replacing it if it has too little time
    /// left.
    ///
    /// # Errors
    /// [`SessionError::Store`] if the player does not exist or the new token
    /// collides with another player's.
    pub async fn issue_or_renew(&self, player_id: PlayerId) -> Result<String, SessionError> {
        let mut record = self
            .store
            .lock(player_id)
            .await
            .ok_or(StoreError::PlayerNotFound(player_id))?;
        self.issue_locked(&mut record, self.clock.now_ms()).await
    }

    async fn issue_locked(
        &self,
        record: &mut PlayerRecord,
        now_ms: i64,
    ) -> Result<String, SessionError> {
        let player = &mut record.player;

        if let Some(token) = &player.token {
            let left_ms = player.token_expires_ms.saturating_sub(now_ms);
            if left_ms > self.config.renew_margin_ms() {
                tracing::debug!(player_id = %player.id, left_ms, "token reused");
                return Ok(token.clone());
            }
        }

        let token = generate_token();
        self.store
            .reindex_token(player.id, player.token.as_deref(), &token)
            .await?;
        player.token = Some(token.clone());
        player.token_expires_ms = now_ms.saturating_add(self.config.token_ttl_ms());

        tracing::info!(player_id = %player.id, expires_ms = player.token_expires_ms, "token issued");
        Ok(token)
    }

    /// Expires the player's token immediately.
    ///
    /// # Errors
    /// [`SessionError::Store`] if the player does not exist.
    pub async fn revoke(&self, player_id: PlayerId) -> Result<(), SessionError> {
        let mut record = self
            .store
            .lock(player_id)
            .await
            .ok_or(StoreError::PlayerNotFound(player_id))?;
        record.player.token_expires_ms = self.clock.now_ms().saturating_sub(1);

        tracing::info!(%player_id, "token revoked");
        Ok(())
    }

    /// Resolves a bearer token to its session. Expired, revoked, and unknown
    /// tokens all resolve to `None`.
    pub async fn resolve(&self, token: &str) -> Option<Session> {
        let player_id = self.store.player_for_token(token).await?;
        let record = self.store.lock(player_id).await?;
        let player = &record.player;

        if player.token.as_deref() != Some(token) {
            return None;
        }
        if player.token_expires_ms <= self.clock.now_ms() {
            return None;
        }
        Some(Session {
            player_id,
            secret: player.session_secret_key(),
        })
    }

    /// Resolves a token as it appears in a URL path (hex of the token's
    /// bytes). Malformed hex resolves to `None`.
    pub async fn resolve_hex(&self, hex_token: &str) -> Option<Session> {
        let bytes = hex::decode(hex_token).ok()?;
        let token = String::from_utf8(bytes).ok()?;
        self.resolve(&token).await
    }
}

/// Generates a bearer token: 24 random bytes (192 bits), base64-encoded to
/// 32 characters.
fn generate_token() -> String {
    let bytes: [u8; 24] = rand::rng().random();
    BASE64.encode(bytes)
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! Unit tests for `SessionManager`, named
    //! `test_{function}_{scenario}_{expected}`.
    //!
    //! Time is a `ManualClock`, so expiry and renewal are deterministic.

    use racer_store::{CatalogSeed, StaticCatalog};
    use racer_timer::ManualClock;

    use super::*;
    use crate::VkVerifier;

    const SECRET: &str = "app-secret";
    const T0: i64 = 1_700_000_000_000;

    struct Harness {
        manager: SessionManager,
        store: Arc<Store>,
        clock: Arc<ManualClock>,
    }

    fn harness() -> Harness {
        let store = Arc::new(Store::new());
        let clock = Arc::new(ManualClock::new(T0));
        let catalog = Arc::new(StaticCatalog::from_seed(CatalogSeed::builtin()).unwrap());
        let manager = SessionManager::new(
            store.clone(),
            catalog,
            Arc::new(VkVerifier::new(SECRET)),
            clock.clone(),
            SessionConfig::default(),
        );
        Harness {
            manager,
            store,
            clock,
        }
    }

    async fn registered(h: &Harness, viewer_id: u64) -> PlayerId {
        let catalog = StaticCatalog::from_seed(CatalogSeed::builtin()).unwrap();
        h.store
            .enter_game(
                PlatformIdentity::new("vk.com", viewer_id),
                h.clock.now_ms(),
                &catalog,
            )
            .await
            .unwrap()
            .player_id
    }

    fn start_request(viewer_id: u64) -> StartRequest {
        let verifier = VkVerifier::new(SECRET);
        StartRequest {
            platform: "vk.com".into(),
            platform_id: viewer_id.to_string(),
            platform_api_id: "1".into(),
            platform_auth_key: verifier.auth_key("1", &viewer_id.to_string()),
        }
    }

    // =====================================================================
    // issue_or_renew()
    // =====================================================================

    #[tokio::test]
    async fn test_issue_or_renew_first_call_issues_token() {
        let h = harness();
        let id = registered(&h, 1).await;

        let token = h.manager.issue_or_renew(id).await.unwrap();

        assert_eq!(token.len(), 32);
        let record = h.store.lock(id).await.unwrap();
        assert_eq!(record.player.token.as_deref(), Some(token.as_str()));
        assert_eq!(record.player.token_expires_ms, T0 + 3_600_000);
    }

    #[tokio::test]
    async fn test_issue_or_renew_inside_margin_reuses_token() {
        let h = harness();
        let id = registered(&h, 1).await;
        let first = h.manager.issue_or_renew(id).await.unwrap();

        // 61 s left: still reusable.
        h.clock.advance(3_600_000 - 61_000);
        let second = h.manager.issue_or_renew(id).await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_issue_or_renew_near_expiry_issues_fresh_token() {
        let h = harness();
        let id = registered(&h, 1).await;
        let first = h.manager.issue_or_renew(id).await.unwrap();

        // Exactly 60 s left: no longer reusable.
        h.clock.advance(3_600_000 - 60_000);
        let second = h.manager.issue_or_renew(id).await.unwrap();

        assert_ne!(first, second);
        assert!(h.manager.resolve(&first).await.is_none());
        assert!(h.manager.resolve(&second).await.is_some());
    }

    #[tokio::test]
    async fn test_issue_or_renew_unknown_player_is_store_error() {
        let h = harness();

        let result = h.manager.issue_or_renew(PlayerId(99)).await;

        assert!(matches!(
            result,
            Err(SessionError::Store(StoreError::PlayerNotFound(_)))
        ));
    }

    // =====================================================================
    // resolve() / resolve_hex() / revoke()
    // =====================================================================

    #[tokio::test]
    async fn test_resolve_after_ttl_is_none() {
        let h = harness();
        let id = registered(&h, 1).await;
        let token = h.manager.issue_or_renew(id).await.unwrap();

        h.clock.advance(3_600_000);

        assert!(h.manager.resolve(&token).await.is_none());
    }

    #[tokio::test]
    async fn test_revoke_fails_lookups_closed() {
        let h = harness();
        let id = registered(&h, 1).await;
        let token = h.manager.issue_or_renew(id).await.unwrap();

        h.manager.revoke(id).await.unwrap();

        assert!(h.manager.resolve(&token).await.is_none());
    }

    #[tokio::test]
    async fn test_resolve_hex_round_trips_token() {
        let h = harness();
        let id = registered(&h, 1).await;
        let token = h.manager.issue_or_renew(id).await.unwrap();

        let session = h.manager.resolve_hex(&hex::encode(&token)).await.unwrap();

        assert_eq!(session.player_id, id);
    }

    #[tokio::test]
    async fn test_resolve_hex_malformed_is_none() {
        let h = harness();

        assert!(h.manager.resolve_hex("zz-not-hex").await.is_none());
        assert!(h.manager.resolve_hex("abc").await.is_none());
        assert!(h.manager.resolve_hex("").await.is_none());
    }

    // =====================================================================
    // start()
    // =====================================================================

    #[tokio::test]
    async fn test_start_sets_secret_from_login_and_start() {
        let h = harness();
        let id = registered(&h, 5).await;
        h.clock.advance(2_500);

        let started = h.manager.start(&start_request(5)).await.unwrap();

        assert_eq!(started.player_id, id);
        assert_eq!(started.start_ms, T0 + 2_500);
        assert_eq!(started.secret, "2500");
        let session = h.manager.resolve(&started.token).await.unwrap();
        assert_eq!(session.secret, "2500");
    }

    #[tokio::test]
    async fn test_start_unregistered_player_does_not_create() {
        let h = harness();

        let result = h.manager.start(&start_request(5)).await;

        assert!(matches!(result, Err(SessionError::PlayerNotFound(_))));
        assert_eq!(h.store.player_count().await, 0);
    }

    #[tokio::test]
    async fn test_start_bad_proof_is_auth_failed() {
        let h = harness();
        registered(&h, 5).await;
        let mut request = start_request(5);
        request.platform_auth_key = "0".repeat(32);

        let result = h.manager.start(&request).await;

        assert!(matches!(result, Err(SessionError::AuthFailed(_))));
    }

    #[tokio::test]
    async fn test_start_other_platform_is_unsupported() {
        let h = harness();
        let mut request = start_request(5);
        request.platform = "ok.ru".into();

        let result = h.manager.start(&request).await;

        assert!(matches!(result, Err(SessionError::UnsupportedPlatform(_))));
    }

    // =====================================================================
    // generate_token()
    // =====================================================================

    #[test]
    fn test_generate_token_is_base64_of_24_bytes() {
        let token = generate_token();

        assert_eq!(token.len(), 32);
        assert_eq!(BASE64.decode(&token).unwrap().len(), 24);
        assert_ne!(token, generate_token());
    }
}
