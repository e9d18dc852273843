//! `RacerServer` builder, router, and serve loop.
//!
//! This is the entry point for running a racer server. It ties together all
//! the layers: HTTP → protocol → session → store.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use racer_protocol::JsonCodec;
use racer_session::{PlatformVerifier, SessionConfig, SessionManager, VkVerifier};
use racer_store::{Catalog, Limits, PlayerRepository, Store};
use racer_timer::{Clock, SystemClock};
use tokio::net::TcpListener;

use crate::handler;
use crate::{RacerError, ServerConfig};

/// Shared server state handed to every request handler.
///
/// Wrapped in `Arc` so it can be cheaply cloned into each request. The
/// collaborators lock internally, per player, so the state itself needs no
/// outer mutex.
pub struct AppState {
    pub(crate) codec: JsonCodec,
    pub(crate) sessions: SessionManager,
    pub(crate) repo: PlayerRepository,
}

impl AppState {
    /// The session manager (entry, start, tokens).
    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// The player repository (pull, push, timers).
    pub fn repository(&self) -> &PlayerRepository {
        &self.repo
    }
}

/// Builds the HTTP router over `state`.
///
/// | Method | Path | Handler |
/// |---|---|---|
/// | GET | `/health` | liveness |
/// | GET | `/client` | game-client entry |
/// | POST | `/start` | token for a platform proof |
/// | POST | `/pull/{token}` | read player state |
/// | POST | `/push/{token}` | write player state |
/// | POST | `/shop/{token}` | list shop sets |
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handler::health))
        .route("/client", get(handler::client))
        .route("/start", post(handler::start))
        .route("/pull/{token}", post(handler::pull))
        .route("/push/{token}", post(handler::push))
        .route("/shop/{token}", post(handler::shop))
        .with_state(state)
}

/// Builder for configuring and starting a racer server.
///
/// # Example
///
/// ```rust,no_run
/// use racer::prelude::*;
///
/// # async fn run() -> Result<(), RacerError> {
/// let server = RacerServer::builder()
///     .bind("0.0.0.0:8080")
///     .app_secret("vk-secure-key")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct RacerServerBuilder {
    config: ServerConfig,
    catalog: Option<Arc<dyn Catalog>>,
    clock: Option<Arc<dyn Clock>>,
    verifier: Option<Arc<dyn PlatformVerifier>>,
}

impl RacerServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            catalog: None,
            clock: None,
            verifier: None,
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Sets the platform app secret used by the default VK verifier.
    pub fn app_secret(mut self, secret: &str) -> Self {
        self.config.app_secret = secret.to_string();
        self
    }

    /// Sets the token configuration.
    pub fn session_config(mut self, session: SessionConfig) -> Self {
        self.config.session = session;
        self
    }

    /// Sets the bounds on pushed values.
    pub fn limits(mut self, limits: Limits) -> Self {
        self.config.limits = limits;
        self
    }

    /// Uses `catalog` instead of loading one from the configuration.
    pub fn catalog(mut self, catalog: Arc<dyn Catalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Uses `clock` instead of the system clock.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Uses `verifier` instead of a [`VkVerifier`] over the app secret.
    pub fn verifier(mut self, verifier: Arc<dyn PlatformVerifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    /// Wires the collaborators into shared state without binding a socket.
    ///
    /// # Errors
    /// Fails if the configured catalog cannot be loaded.
    pub fn build_state(self) -> Result<Arc<AppState>, RacerError> {
        let catalog: Arc<dyn Catalog> = match self.catalog {
            Some(catalog) => catalog,
            None => Arc::new(self.config.load_catalog()?),
        };
        let clock: Arc<dyn Clock> = match self.clock {
            Some(clock) => clock,
            None => Arc::new(SystemClock),
        };
        let verifier: Arc<dyn PlatformVerifier> = match self.verifier {
            Some(verifier) => verifier,
            None => Arc::new(VkVerifier::new(self.config.app_secret.clone())),
        };
        let store = Arc::new(Store::new());

        let sessions = SessionManager::new(
            Arc::clone(&store),
            Arc::clone(&catalog),
            verifier,
            Arc::clone(&clock),
            self.config.session,
        );
        let repo = PlayerRepository::new(store, catalog, clock, self.config.limits);

        Ok(Arc::new(AppState {
            codec: JsonCodec,
            sessions,
            repo,
        }))
    }

    /// Builds the router without binding a socket. Used by in-process tests.
    ///
    /// # Errors
    /// Fails if the configured catalog cannot be loaded.
    pub fn build_router(self) -> Result<Router, RacerError> {
        Ok(router(self.build_state()?))
    }

    /// Builds the state and binds the listener.
    ///
    /// # Errors
    /// Fails if the catalog cannot be loaded or the address cannot be bound.
    pub async fn build(self) -> Result<RacerServer, RacerError> {
        let bind_addr = self.config.bind_addr.clone();
        let state = self.build_state()?;
        let listener = TcpListener::bind(bind_addr.as_str()).await?;
        Ok(RacerServer {
            listener,
            router: router(state),
        })
    }
}

impl Default for RacerServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound racer server.
///
/// Call [`run()`](Self::run) to start serving requests.
pub struct RacerServer {
    listener: TcpListener,
    router: Router,
}

impl RacerServer {
    /// Creates a new builder.
    pub fn builder() -> RacerServerBuilder {
        RacerServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// Serves requests until Ctrl-C.
    pub async fn run(self) -> Result<(), RacerError> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Serves requests until `shutdown` completes, then drains in-flight
    /// requests.
    pub async fn run_until(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), RacerError> {
        let addr = self.listener.local_addr()?;
        tracing::info!(%addr, "racer server running");

        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("racer server stopped");
        Ok(())
    }
}
