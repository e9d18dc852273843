use std::path::PathBuf;

use clap::Parser;
use racer::prelude::*;
use tracing_subscriber::EnvFilter;

/// Signed pull/push game-state server.
///
/// Every flag can also be set through its environment variable.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Address to bind the HTTP listener to
    #[arg(long, env = "RACER_BIND", default_value = "127.0.0.1:8080")]
    bind: String,

    /// VK application secure key
    #[arg(long, env = "VK_APP_SECURE_KEY", default_value = "", hide_env_values = true)]
    app_secret: String,

    /// Bearer token lifetime in seconds
    #[arg(long, env = "RACER_TOKEN_TTL_SECS", default_value_t = 3_600)]
    token_ttl_secs: u64,

    /// Highest level a client may push
    #[arg(long, env = "RACER_MAX_LEVEL", default_value_t = 9_999)]
    max_level: u32,

    /// Highest resource count a client may push
    #[arg(long, env = "RACER_MAX_RESOURCE_COUNT", default_value_t = 999_999_999)]
    max_resource_count: u64,

    /// JSON catalog file; the built-in catalog is used when absent
    #[arg(long, env = "RACER_CATALOG")]
    catalog: Option<PathBuf>,
}

impl Args {
    fn into_config(self) -> ServerConfig {
        let mut config = ServerConfig::default()
            .with_bind(self.bind)
            .with_app_secret(self.app_secret)
            .with_session(SessionConfig {
                token_ttl_secs: self.token_ttl_secs,
                ..SessionConfig::default()
            })
            .with_limits(Limits {
                max_level: self.max_level,
                max_resource_count: self.max_resource_count,
            });
        if let Some(path) = self.catalog {
            config = config.with_catalog_path(path);
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Args::parse().into_config();
    if config.app_secret.is_empty() {
        tracing::warn!("VK_APP_SECURE_KEY is empty; every platform proof will be rejected");
    }
    if let Some(path) = &config.catalog_path {
        tracing::info!(path = %path.display(), "loading catalog");
    }

    let server = RacerServer::builder().config(config).build().await?;
    server.run().await?;
    Ok(())
}
