//! Server configuration.

use std::path::PathBuf;

use racer_session::SessionConfig;
use racer_store::{CatalogSeed, Limits, StaticCatalog};

use crate::RacerError;

/// Everything the server needs besides its collaborators.
///
/// Start from [`ServerConfig::default`] and override fields with the
/// `with_*` setters:
///
/// ```rust
/// use racer::ServerConfig;
///
/// let config = ServerConfig::default()
///     .with_bind("0.0.0.0:9000")
///     .with_app_secret("vk-secure-key");
/// assert_eq!(config.bind_addr, "0.0.0.0:9000");
/// ```
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to. Default: `127.0.0.1:8080`.
    pub bind_addr: String,

    /// The platform app's secure key. With an empty key every platform
    /// proof is rejected.
    pub app_secret: String,

    /// Token lifetime and renewal margin.
    pub session: SessionConfig,

    /// Bounds on pushed values.
    pub limits: Limits,

    /// JSON catalog file. `None` uses the built-in catalog.
    pub catalog_path: Option<PathBuf>,
}

impl ServerConfig {
    pub fn with_bind(mut self, addr: impl Into<String>) -> Self {
        self.bind_addr = addr.into();
        self
    }

    pub fn with_app_secret(mut self, secret: impl Into<String>) -> Self {
        self.app_secret = secret.into();
        self
    }

    pub fn with_session(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_catalog_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.catalog_path = Some(path.into());
        self
    }

    /// Loads the configured catalog, or the built-in one.
    ///
    /// # Errors
    /// [`RacerError::Io`] if the file cannot be read, or
    /// [`RacerError::Store`] if its contents are not a valid catalog.
    pub fn load_catalog(&self) -> Result<StaticCatalog, RacerError> {
        let catalog = match &self.catalog_path {
            Some(path) => {
                let json = std::fs::read_to_string(path)?;
                StaticCatalog::from_json(&json)?
            }
            None => StaticCatalog::from_seed(CatalogSeed::builtin())?,
        };
        Ok(catalog)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            app_secret: String::new(),
            session: SessionConfig::default(),
            limits: Limits::default(),
            catalog_path: None,
        }
    }
}
