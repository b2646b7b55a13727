//! chatrelay-core — wire types, configuration, and credential hashing.
//! All other chatrelay crates depend on this one.

pub mod auth;
pub mod config;
pub mod wire;

pub use auth::{AuthError, Authenticator, PasswordHash, Pbkdf2Authenticator};
pub use wire::{Command, DecodeError, Notification, Packet, Response, Status, GROUP_MARKER};
