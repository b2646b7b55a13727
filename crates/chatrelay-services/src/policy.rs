//! Delivery policy — may a message from `sender` reach `target`, and where.
//!
//! Decisions are made fresh on every call from the presence registry and the
//! directory store's blacklist; nothing is cached. Precedence:
//!
//! 1. target is not a registered identity → `TargetUnknownIdentity`
//! 2. target has no presence entry        → `TargetOffline`
//! 3. either side blacklisted the other   → `Blocked`
//! 4. otherwise                           → `Deliver(addr)`
//!
//! The sender's own presence never matters here.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::directory::{DirectoryStore, Result};
use crate::presence::PresenceRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    TargetUnknownIdentity,
    TargetOffline,
    Blocked,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::TargetUnknownIdentity => "target unknown",
            Self::TargetOffline => "target offline",
            Self::Blocked => "blocked",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Deliver(SocketAddr),
    Skip(SkipReason),
}

#[derive(Clone)]
pub struct DeliveryPolicy {
    store: Arc<dyn DirectoryStore>,
    presence: PresenceRegistry,
}

impl DeliveryPolicy {
    pub fn new(store: Arc<dyn DirectoryStore>, presence: PresenceRegistry) -> Self {
        Self { store, presence }
    }

    /// Decide delivery of one message from `sender` to `target`.
    pub fn route(&self, sender: &str, target: &str) -> Result<Route> {
        if self.store.find_identity(target)?.is_none() {
            return Ok(Route::Skip(SkipReason::TargetUnknownIdentity));
        }
        let Some(addr) = self.presence.lookup(target) else {
            return Ok(Route::Skip(SkipReason::TargetOffline));
        };
        if self.store.is_blocked(sender, target)? {
            return Ok(Route::Skip(SkipReason::Blocked));
        }
        Ok(Route::Deliver(addr))
    }

    /// Route a group send: every other online identity, each decided
    /// independently. Only deliverable recipients are returned.
    pub fn route_group(&self, sender: &str) -> Result<Vec<(String, SocketAddr)>> {
        let mut candidates = self.presence.snapshot();
        candidates.retain(|login| login != sender);
        candidates.sort();

        let mut out = Vec::with_capacity(candidates.len());
        for login in candidates {
            match self.route(sender, &login)? {
                Route::Deliver(addr) => out.push((login, addr)),
                Route::Skip(reason) => {
                    tracing::debug!(%sender, target = %login, %reason, "group delivery skipped");
                }
            }
        }
        Ok(out)
    }
}
