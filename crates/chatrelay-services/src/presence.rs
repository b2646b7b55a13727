//! Presence registry — which identities are online, and where.
//!
//! The only place "online" is defined. One entry per login; a second login
//! from a new address replaces the first (last write wins). Nothing here is
//! persisted, so a restart logs everybody out.

use std::net::SocketAddr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

/// A live session: the address an identity last authenticated from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceEntry {
    pub login: String,
    pub addr: SocketAddr,
    pub since: DateTime<Utc>,
}

/// Shared login → address table. Clones share the same map.
#[derive(Clone, Default)]
pub struct PresenceRegistry {
    entries: Arc<DashMap<String, PresenceEntry>>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert. Returns the address that was replaced, if any.
    pub fn set(&self, login: &str, addr: SocketAddr) -> Option<SocketAddr> {
        let entry = PresenceEntry {
            login: login.to_string(),
            addr,
            since: Utc::now(),
        };
        self.entries
            .insert(login.to_string(), entry)
            .map(|old| old.addr)
    }

    /// Idempotent. Returns the entry that was removed, if any.
    pub fn remove(&self, login: &str) -> Option<PresenceEntry> {
        self.entries.remove(login).map(|(_, entry)| entry)
    }

    pub fn lookup(&self, login: &str) -> Option<SocketAddr> {
        self.entries.get(login).map(|e| e.addr)
    }

    pub fn entry(&self, login: &str) -> Option<PresenceEntry> {
        self.entries.get(login).map(|e| e.value().clone())
    }

    pub fn is_online(&self, login: &str) -> bool {
        self.entries.contains_key(login)
    }

    /// Logins currently online, in no particular order.
    pub fn snapshot(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
