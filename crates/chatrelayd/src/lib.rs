//! chatrelayd — UDP chat relay daemon.
//!
//! The binary wires configuration, the SQLite directory and the dispatcher
//! into a [`RelayServer`]. The pieces are exposed here so the relay can be
//! run in-process by tests.

pub mod server;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use chatrelay_api::{Dispatcher, RelayState};
use chatrelay_core::config::RelayConfig;
use chatrelay_core::Pbkdf2Authenticator;
use chatrelay_services::{PresenceRegistry, SqliteDirectory};

pub use server::RelayServer;

/// Open the directory store and assemble a dispatcher from `config`.
pub fn build_dispatcher(config: &RelayConfig) -> Result<Dispatcher> {
    let store = SqliteDirectory::open(
        &config.storage.database_path,
        Duration::from_millis(config.storage.busy_timeout_ms),
    )
    .with_context(|| {
        format!(
            "failed to open directory database at {}",
            config.storage.database_path.display()
        )
    })?;

    let auth = Pbkdf2Authenticator::new(config.auth.pbkdf2_iterations);
    tracing::info!(iterations = auth.iterations(), "password hashing ready");

    let state = RelayState::new(
        Arc::new(store),
        PresenceRegistry::new(),
        Arc::new(auth),
        config.auth.min_password_len,
    );
    Ok(Dispatcher::new(state))
}
