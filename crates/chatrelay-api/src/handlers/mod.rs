//! Command handlers — one function per inbound command type.
//!
//! Handlers are synchronous and take the shared [`RelayState`] by reference.
//! They return an [`Outcome`] (reply text, optional data, pushes to other
//! identities) or a [`CommandError`] that the dispatcher turns into a `Fail`.

pub mod account;
pub mod contacts;
pub mod messages;
pub mod search;

use std::net::SocketAddr;
use std::sync::Arc;

use chatrelay_core::auth::MIN_PASSWORD_LEN;
use chatrelay_core::{Authenticator, Notification};
use chatrelay_services::{DeliveryPolicy, DirectoryStore, Identity, PresenceRegistry};

use crate::error::CommandError;
use crate::Outbound;

#[derive(Clone)]
pub struct RelayState {
    pub store: Arc<dyn DirectoryStore>,
    pub presence: PresenceRegistry,
    pub policy: DeliveryPolicy,
    pub auth: Arc<dyn Authenticator>,
    /// Shortest password `Register` accepts. Never below [`MIN_PASSWORD_LEN`].
    pub min_password_len: usize,
}

impl RelayState {
    pub fn new(
        store: Arc<dyn DirectoryStore>,
        presence: PresenceRegistry,
        auth: Arc<dyn Authenticator>,
        min_password_len: usize,
    ) -> Self {
        let policy = DeliveryPolicy::new(store.clone(), presence.clone());
        Self {
            store,
            presence,
            policy,
            auth,
            min_password_len: min_password_len.max(MIN_PASSWORD_LEN),
        }
    }
}

/// What a successful handler produced.
#[derive(Debug, Default)]
pub struct Outcome {
    /// Reply text for the sender. `None` means the sender gets no reply.
    pub message: Option<String>,
    pub data: Option<serde_json::Value>,
    /// Notifications for other identities, sent after the reply.
    pub pushes: Vec<Outbound>,
}

impl Outcome {
    pub fn reply(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn silent() -> Self {
        Self::default()
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn push(&mut self, addr: SocketAddr, notification: Notification) {
        self.pushes.push(Outbound::new(addr, notification));
    }
}

pub type HandlerResult = Result<Outcome, CommandError>;

// ── Shared helpers ────────────────────────────────────────────────────────────

fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

/// Look up `login` or fail with `reason`.
fn require_identity(
    state: &RelayState,
    login: &str,
    reason: &str,
) -> Result<Identity, CommandError> {
    state
        .store
        .find_identity(login)?
        .ok_or_else(|| CommandError::not_found(reason))
}
