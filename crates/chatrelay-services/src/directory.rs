//! Directory store — durable accounts, social graph, history and audit log.
//!
//! [`DirectoryStore`] is the seam the dispatcher talks to. Every method is an
//! independent call that either succeeds or returns a [`StoreError`]; nothing
//! is cached across calls. The production implementation is
//! [`SqliteDirectory`](crate::sqlite_directory::SqliteDirectory).

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A uniqueness or foreign-key constraint rejected the write.
    #[error("constraint violated: {0}")]
    Conflict(String),

    #[error("record not found")]
    NotFound,

    #[error("migration error: {0}")]
    Migration(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection mutex was poisoned by a panicking caller.
    #[error("store unavailable")]
    Unavailable,
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// A registered account.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub login: String,
    pub email: String,
    pub name: Option<String>,
    pub surname: Option<String>,
    pub birthday: Option<NaiveDate>,
    /// Base64 PBKDF2 salt.
    pub salt: String,
    /// Base64 PBKDF2 digest.
    pub password_digest: String,
    pub created_at: DateTime<Utc>,
    /// Best-effort mirror of presence. Not authoritative.
    pub online: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewIdentity {
    pub login: String,
    pub email: String,
    pub name: Option<String>,
    pub surname: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub salt: String,
    pub password_digest: String,
}

/// One persisted message row. A group send produces one row per recipient,
/// all sharing `message_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredMessage {
    pub id: i64,
    pub message_id: String,
    pub sender: String,
    pub receiver: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub is_group: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    pub message_id: String,
    pub sender: String,
    pub receiver: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub is_group: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    pub login: String,
    pub event: String,
    pub timestamp: DateTime<Utc>,
}

pub trait DirectoryStore: Send + Sync {
    // ── Identities ────────────────────────────────────────────────────────────

    fn find_identity(&self, login: &str) -> Result<Option<Identity>>;
    fn find_identity_by_email(&self, email: &str) -> Result<Option<Identity>>;
    /// Fails with [`StoreError::Conflict`] if the login or email is taken.
    fn create_identity(&self, identity: NewIdentity) -> Result<()>;
    fn set_online(&self, login: &str, online: bool) -> Result<()>;

    // ── Social graph ──────────────────────────────────────────────────────────

    /// True if either party has blacklisted the other.
    fn is_blocked(&self, a: &str, b: &str) -> Result<bool>;

    fn contacts_of(&self, owner: &str) -> Result<Vec<String>>;
    fn has_contact(&self, owner: &str, contact: &str) -> Result<bool>;
    /// Returns false if the edge already existed.
    fn add_contact(&self, owner: &str, contact: &str) -> Result<bool>;
    /// Returns false if there was no such edge.
    fn remove_contact(&self, owner: &str, contact: &str) -> Result<bool>;

    fn blacklist_of(&self, owner: &str) -> Result<Vec<String>>;
    fn has_blacklist_entry(&self, owner: &str, blocked: &str) -> Result<bool>;
    fn add_blacklist_entry(&self, owner: &str, blocked: &str) -> Result<bool>;
    fn remove_blacklist_entry(&self, owner: &str, blocked: &str) -> Result<bool>;

    // ── Messages ──────────────────────────────────────────────────────────────

    fn record_message(&self, message: NewMessage) -> Result<()>;
    /// Both directions between `a` and `b`, oldest first.
    fn messages_between(&self, a: &str, b: &str) -> Result<Vec<StoredMessage>>;
    /// One row per group send, oldest first.
    fn group_messages(&self) -> Result<Vec<StoredMessage>>;
    /// Everything `login` sent or received, oldest first. A group send by
    /// `login` appears once.
    fn messages_involving(&self, login: &str) -> Result<Vec<StoredMessage>>;

    // ── Search ────────────────────────────────────────────────────────────────

    /// Logins containing `query`, case-insensitive.
    fn search_identities(&self, query: &str) -> Result<Vec<String>>;
    /// Messages whose text contains `query`, optionally from one sender only.
    fn search_messages(&self, query: &str, sender: Option<&str>) -> Result<Vec<StoredMessage>>;

    // ── Audit ─────────────────────────────────────────────────────────────────

    fn record_audit(&self, login: &str, event: &str, timestamp: DateTime<Utc>) -> Result<()>;
    fn audit_entries(&self, login: &str) -> Result<Vec<AuditEntry>>;
}
