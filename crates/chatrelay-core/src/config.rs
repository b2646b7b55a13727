//! Configuration system for chatrelay.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $CHATRELAY_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/chatrelay/config.toml
//!   3. ~/.config/chatrelay/config.toml

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::auth::{MIN_ITERATIONS, MIN_PASSWORD_LEN};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub network: NetworkConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// UDP address the relay listens on.
    pub bind_addr: SocketAddr,
    /// Receive buffer size. Larger datagrams are truncated by the kernel.
    pub max_datagram_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database file for the directory store.
    pub database_path: PathBuf,
    /// How long a store call waits on a locked database.
    pub busy_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// PBKDF2 rounds. Values below 100 000 are raised to 100 000.
    pub pbkdf2_iterations: u32,
    /// Values below 8 are raised to 8.
    pub min_password_len: usize,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 11000)),
            max_datagram_size: 65_507,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: data_dir().join("chatrelay.db"),
            busy_timeout_ms: 5_000,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            pbkdf2_iterations: MIN_ITERATIONS,
            min_password_len: MIN_PASSWORD_LEN,
        }
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("chatrelay")
}

pub fn data_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".local").join("share"))
        .join("chatrelay")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl RelayConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_file(&Self::file_path())?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.normalize();
        Ok(config)
    }

    /// Parse a config file, or return defaults if it does not exist.
    pub fn load_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFailed(path.to_path_buf(), e))?;
        let mut config: Self =
            toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.to_path_buf(), e))?;
        config.normalize();
        Ok(config)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("CHATRELAY_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&RelayConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text).map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Apply CHATRELAY_* overrides. `lookup` is `std::env::var` in production.
    fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("CHATRELAY_NETWORK__BIND_ADDR") {
            match v.parse() {
                Ok(addr) => self.network.bind_addr = addr,
                Err(_) => tracing::warn!(value = %v, "invalid CHATRELAY_NETWORK__BIND_ADDR, ignoring"),
            }
        }
        if let Some(v) = lookup("CHATRELAY_NETWORK__MAX_DATAGRAM_SIZE") {
            if let Ok(n) = v.parse() {
                self.network.max_datagram_size = n;
            }
        }
        if let Some(v) = lookup("CHATRELAY_STORAGE__DATABASE_PATH") {
            self.storage.database_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("CHATRELAY_AUTH__PBKDF2_ITERATIONS") {
            if let Ok(n) = v.parse() {
                self.auth.pbkdf2_iterations = n;
            }
        }
    }

    /// Clamp values that would weaken the relay.
    fn normalize(&mut self) {
        self.auth.pbkdf2_iterations = self.auth.pbkdf2_iterations.max(MIN_ITERATIONS);
        self.auth.min_password_len = self.auth.min_password_len.max(MIN_PASSWORD_LEN);
        self.network.max_datagram_size = self.network.max_datagram_size.clamp(512, 65_507);
    }
}
