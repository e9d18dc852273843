//! Verification of the embedding platform's signed handoff.
//!
//! The racer backend does not authenticate players itself. The platform
//! that embeds the game client (VK) does, and hands the result over in two
//! places:
//!
//! 1. **Launch parameters**: the iframe URL's query string, signed by the
//!    platform with the shared app secret. Checked at game-client entry.
//! 2. **Start proof**: the `platformID` / `platformAPIID` /
//!    `platformAuthKey` triple the client forwards to `/start`.
//!
//! [`PlatformVerifier`] turns either into the platform's user id, or
//! rejects it. Verification is pure computation: it happens before any
//! store access, so forged requests never reach player state.

use std::collections::BTreeMap;

use racer_protocol::{StartRequest, md5_hex, query_signature};

use crate::SessionError;

/// Checks a platform's handoff and extracts the platform user id.
///
/// # Trait bounds
///
/// `Send + Sync + 'static` so a single verifier can be shared by every
/// request handler for the life of the server.
pub trait PlatformVerifier: Send + Sync + 'static {
    /// The platform name stored on player identities, e.g. `"vk.com"`.
    fn platform(&self) -> &str;

    /// Validates game-client launch parameters.
    ///
    /// # Returns
    /// - `Ok(platform_id)`: the signature and auth key hold and the user id
    ///   is positive
    /// - `Err(SessionError::AuthFailed)`: anything else
    fn verify_launch(
        &self,
        params: &BTreeMap<String, String>,
    ) -> Result<u64, SessionError>;

    /// Validates the proof carried by a `/start` request.
    fn verify_start(&self, request: &StartRequest) -> Result<u64, SessionError>;
}

// ---------------------------------------------------------------------------
// VK
// ---------------------------------------------------------------------------

/// Platform name VK players are registered under.
pub const VK_PLATFORM: &str = "vk.com";

const VK_SIG: &str = "sig";
const VK_API_ID: &str = "api_id";
const VK_VIEWER_ID: &str = "viewer_id";
const VK_AUTH_KEY: &str = "auth_key";

/// Verifies VK iframe launches with the app's secure key.
///
/// - Launch signature: `md5(k1=v1k2=v2... + secret)` over every query
///   parameter except `sig`, keys sorted.
/// - Auth key: `md5("{api_id}_{viewer_id}_{secret}")`.
#[derive(Clone)]
pub struct VkVerifier {
    app_secret: String,
}

impl VkVerifier {
    pub fn new(app_secret: impl Into<String>) -> Self {
        Self {
            app_secret: app_secret.into(),
        }
    }

    /// Computes the auth key VK would issue for this viewer.
    pub fn auth_key(&self, api_id: &str, viewer_id: &str) -> String {
        md5_hex(&format!("{api_id}_{viewer_id}_{}", self.app_secret))
    }

    fn require_secret(&self) -> Result<(), SessionError> {
        if self.app_secret.is_empty() {
            tracing::error!("VK app secret is not configured, rejecting all proofs");
            return Err(SessionError::AuthFailed("app secret not configured".into()));
        }
        Ok(())
    }

    fn check_auth_key(
        &self,
        api_id: &str,
        viewer_id: &str,
        auth_key: &str,
    ) -> Result<(), SessionError> {
        if self.auth_key(api_id, viewer_id) != auth_key {
            return Err(SessionError::AuthFailed("auth key mismatch".into()));
        }
        Ok(())
    }
}

impl std::fmt::Debug for VkVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VkVerifier")
            .field("app_secret", &"***")
            .finish()
    }
}

impl PlatformVerifier for VkVerifier {
    fn platform(&self) -> &str {
        VK_PLATFORM
    }

    fn verify_launch(
        &self,
        params: &BTreeMap<String, String>,
    ) -> Result<u64, SessionError> {
        self.require_secret()?;
        let field = |name: &str| params.get(name).map(String::as_str).unwrap_or_default();

        if query_signature(params, &self.app_secret) != field(VK_SIG) {
            return Err(SessionError::AuthFailed("launch signature mismatch".into()));
        }
        self.check_auth_key(field(VK_API_ID), field(VK_VIEWER_ID), field(VK_AUTH_KEY))?;
        positive_id(field(VK_VIEWER_ID))
    }

    fn verify_start(&self, request: &StartRequest) -> Result<u64, SessionError> {
        self.require_secret()?;
        self.check_auth_key(
            &request.platform_api_id,
            &request.platform_id,
            &request.platform_auth_key,
        )?;
        positive_id(&request.platform_id)
    }
}

fn positive_id(raw: &str) -> Result<u64, SessionError> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|&id| id > 0)
        .ok_or_else(|| SessionError::AuthFailed("platform id must be a positive integer".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "s3cr3t";

    fn launch(viewer_id: &str) -> BTreeMap<String, String> {
        let verifier = VkVerifier::new(SECRET);
        let mut params = BTreeMap::from([
            ("api_id".to_string(), "51234".to_string()),
            ("viewer_id".to_string(), viewer_id.to_string()),
            ("is_app_user".to_string(), "1".to_string()),
        ]);
        params.insert("auth_key".into(), verifier.auth_key("51234", viewer_id));
        let sig = query_signature(&params, SECRET);
        params.insert("sig".into(), sig);
        params
    }

    fn start(viewer_id: &str, auth_key: String) -> StartRequest {
        StartRequest {
            platform: VK_PLATFORM.into(),
            platform_id: viewer_id.into(),
            platform_api_id: "51234".into(),
            platform_auth_key: auth_key,
        }
    }

    #[test]
    fn test_auth_key_matches_known_formula() {
        let verifier = VkVerifier::new(SECRET);

        assert_eq!(
            verifier.auth_key("1", "2"),
            md5_hex("1_2_s3cr3t"),
        );
    }

    #[test]
    fn test_verify_launch_valid_returns_viewer_id() {
        let verifier = VkVerifier::new(SECRET);

        assert_eq!(verifier.verify_launch(&launch("777")).unwrap(), 777);
    }

    #[test]
    fn test_verify_launch_tampered_param_is_rejected() {
        let verifier = VkVerifier::new(SECRET);
        let mut params = launch("777");
        params.insert("is_app_user".into(), "0".into());

        let result = verifier.verify_launch(&params);

        assert!(matches!(result, Err(SessionError::AuthFailed(_))));
    }

    #[test]
    fn test_verify_launch_zero_viewer_is_rejected() {
        let verifier = VkVerifier::new(SECRET);

        let result = verifier.verify_launch(&launch("0"));

        assert!(matches!(result, Err(SessionError::AuthFailed(_))));
    }

    #[test]
    fn test_verify_launch_missing_sig_is_rejected() {
        let verifier = VkVerifier::new(SECRET);
        let mut params = launch("5");
        params.remove("sig");

        assert!(verifier.verify_launch(&params).is_err());
    }

    #[test]
    fn test_verify_start_valid_auth_key() {
        let verifier = VkVerifier::new(SECRET);
        let key = verifier.auth_key("51234", "42");

        assert_eq!(verifier.verify_start(&start("42", key)).unwrap(), 42);
    }

    #[test]
    fn test_verify_start_wrong_auth_key_is_rejected() {
        let verifier = VkVerifier::new(SECRET);

        let result = verifier.verify_start(&start("42", "deadbeef".into()));

        assert!(matches!(result, Err(SessionError::AuthFailed(_))));
    }

    #[test]
    fn test_verify_start_empty_secret_rejects_everything() {
        let verifier = VkVerifier::new("");
        let key = verifier.auth_key("51234", "42");

        assert!(verifier.verify_start(&start("42", key)).is_err());
    }

    #[test]
    fn test_debug_masks_secret() {
        let rendered = format!("{:?}", VkVerifier::new(SECRET));

        assert!(!rendered.contains(SECRET));
    }
}
