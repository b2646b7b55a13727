//! Why a command failed, and what the client is told.

use chatrelay_core::AuthError;
use chatrelay_services::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommandError {
    /// Missing or malformed fields, weak password.
    #[error("{0}")]
    Validation(String),

    /// A named identity or edge does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Refused by the blacklist or by account state.
    #[error("{0}")]
    Denied(String),

    /// Login, email or edge already taken.
    #[error("{0}")]
    Conflict(String),

    #[error("store failure: {0}")]
    Store(#[from] StoreError),

    #[error("credential failure: {0}")]
    Auth(#[from] AuthError),
}

impl CommandError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn denied(msg: impl Into<String>) -> Self {
        Self::Denied(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Text for the `Message` field of the `Fail` response. Internal
    /// failures are not described to clients.
    pub fn reply_message(&self) -> String {
        match self {
            Self::Store(_) | Self::Auth(_) => "Server error".to_string(),
            other => other.to_string(),
        }
    }

    /// True for failures the operator should hear about.
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Store(_) | Self::Auth(_))
    }
}
