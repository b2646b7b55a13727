//! chatrelayd — UDP chat relay daemon.
//!
//! Usage: `chatrelayd [BIND_ADDR]`. Everything else comes from the config
//! file and `CHATRELAY_*` environment variables.

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use chatrelay_core::config::RelayConfig;
use chatrelayd::{build_dispatcher, RelayServer};

const DEFAULT_LOG_FILTER: &str = "info,chatrelayd=debug,chatrelay_api=debug";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    match RelayConfig::write_default_if_missing() {
        Ok(path) => tracing::debug!(path = %path.display(), "config file"),
        Err(e) => tracing::warn!(error = %e, "failed to write default config"),
    }
    let mut config = RelayConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        RelayConfig::default()
    });

    if let Some(arg) = std::env::args().nth(1) {
        config.network.bind_addr = arg
            .parse()
            .with_context(|| format!("invalid bind address {arg:?}"))?;
    }

    let dispatcher = build_dispatcher(&config)?;

    let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(1);
    let server = RelayServer::bind(
        config.network.bind_addr,
        dispatcher,
        config.network.max_datagram_size,
        shutdown_tx.subscribe(),
    )
    .await?;
    tracing::info!(addr = %server.local_addr()?, "chatrelayd listening");

    {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("shutdown signal received");
            let _ = shutdown.send(());
        });
    }

    server.run().await?;
    tracing::info!("chatrelayd stopped");
    Ok(())
}
