//! # Racer
//!
//! Signed pull/push game-state server for a racing game embedded in a
//! social platform's iframe.
//!
//! The platform authenticates the player and hands the game a signed launch.
//! The server turns that into a bearer token and a per-session secret, and
//! from then on serves field-selective reads and validated writes of the
//! player's level, resources, costumes, and timers. Every request and reply
//! body is signed with the session secret.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use racer::prelude::*;
//!
//! # async fn run() -> Result<(), RacerError> {
//! let server = RacerServer::builder()
//!     .bind("0.0.0.0:8080")
//!     .app_secret("vk-secure-key")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;

pub use config::ServerConfig;
pub use error::RacerError;
pub use server::{AppState, RacerServer, RacerServerBuilder, router};

/// Everything needed to configure, run, and test a server in one import.
pub mod prelude {
    pub use racer_protocol::{ErrorCode, PlayerId, sign, signify, verify};
    pub use racer_session::{
        PlatformVerifier, SessionConfig, SessionError, SessionManager, VkVerifier,
    };
    pub use racer_store::{Catalog, CatalogSeed, Limits, StaticCatalog, StoreError};
    pub use racer_timer::{Clock, ManualClock, SystemClock};

    pub use crate::{AppState, RacerError, RacerServer, RacerServerBuilder, ServerConfig, router};
}
