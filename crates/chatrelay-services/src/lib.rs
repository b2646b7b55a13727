//! chatrelay-services — the presence registry, delivery policy and the
//! directory store behind them.

pub mod directory;
pub mod migrations;
pub mod policy;
pub mod presence;
pub mod sqlite_directory;

pub use directory::{
    AuditEntry, DirectoryStore, Identity, NewIdentity, NewMessage, StoreError, StoredMessage,
};
pub use policy::{DeliveryPolicy, Route, SkipReason};
pub use presence::{PresenceEntry, PresenceRegistry};
pub use sqlite_directory::SqliteDirectory;
