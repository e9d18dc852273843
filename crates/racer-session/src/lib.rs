//! Player admission and bearer tokens for the racer backend.
//!
//! This crate handles how a player gets from "the platform says who I am" to
//! "I hold a token and a session secret":
//!
//! 1. **Platform proof**: validating the embedding platform's signed
//!    handoff ([`PlatformVerifier`] trait, [`VkVerifier`])
//! 2. **Entry**: registering the player on first launch
//!    ([`SessionManager::enter`])
//! 3. **Tokens**: issuing, reusing, resolving, and revoking bearer tokens
//!    ([`SessionManager`])
//!
//! # How it fits in the stack
//!
//! ```text
//! HTTP dispatcher (above)  ← resolves tokens, signs with the session secret
//!     ↕
//! Session Layer (this crate)  ← platform proofs, token lifecycle
//!     ↕
//! Store (below)  ← player rows, identity and token indexes
//! ```

mod error;
mod manager;
mod platform;
mod session;

pub use error::SessionError;
pub use manager::SessionManager;
pub use platform::{PlatformVerifier, VK_PLATFORM, VkVerifier};
pub use session::{Session, SessionConfig, StartedSession};
