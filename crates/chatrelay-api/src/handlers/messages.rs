//! SendMessage and GetHistory.

use std::collections::HashSet;
use std::net::SocketAddr;

use chatrelay_core::wire::{HistoryEntry, HistoryRequest, SendMessageRequest};
use chatrelay_core::{Notification, GROUP_MARKER};
use chatrelay_services::{NewMessage, Route, SkipReason, StoredMessage};
use chrono::{DateTime, Utc};
use serde_json::json;
use uuid::Uuid;

use super::{is_blank, require_identity, HandlerResult, Outcome, RelayState};
use crate::error::CommandError;

/// One datagram's worth of fan-out.
struct Fanout<'a> {
    state: &'a RelayState,
    sender: &'a str,
    text: &'a str,
    timestamp: DateTime<Utc>,
    message_id: String,
    outcome: Outcome,
}

impl Fanout<'_> {
    fn persist(&self, receiver: &str, is_group: bool) -> Result<(), CommandError> {
        self.state.store.record_message(NewMessage {
            message_id: self.message_id.clone(),
            sender: self.sender.to_string(),
            receiver: receiver.to_string(),
            text: self.text.to_string(),
            timestamp: self.timestamp,
            is_group,
        })?;
        Ok(())
    }

    fn deliver(&mut self, receiver: &str, addr: SocketAddr, is_group: bool) -> Result<(), CommandError> {
        self.persist(receiver, is_group)?;
        self.outcome.push(
            addr,
            Notification::ReceiveMessage {
                from: self.sender.to_string(),
                text: self.text.to_string(),
                timestamp: self.timestamp,
            },
        );
        Ok(())
    }
}

/// Route one message to every named recipient. Success is silent; only a
/// request that cannot be sent at all gets a `Fail`.
pub fn send_message(state: &RelayState, req: SendMessageRequest) -> HandlerResult {
    require_identity(state, &req.sender_login, "Sender not found")?;
    if !state.presence.is_online(&req.sender_login) {
        return Err(CommandError::denied("Sender is not logged in"));
    }
    if is_blank(&req.text) {
        return Err(CommandError::validation("Message text is empty"));
    }
    if req.recipients.is_empty() {
        return Err(CommandError::validation("No recipients"));
    }

    let mut fanout = Fanout {
        state,
        sender: &req.sender_login,
        text: &req.text,
        timestamp: req.timestamp.unwrap_or_else(Utc::now),
        message_id: Uuid::new_v4().to_string(),
        outcome: Outcome::silent(),
    };
    // At most one delivery per recipient per datagram, whichever way it was named.
    let mut seen: HashSet<String> = HashSet::new();

    for target in &req.recipients {
        if target == GROUP_MARKER {
            for (login, addr) in state.policy.route_group(&req.sender_login)? {
                if seen.insert(login.clone()) {
                    fanout.deliver(&login, addr, true)?;
                }
            }
            continue;
        }
        if !seen.insert(target.clone()) {
            continue;
        }
        if *target == req.sender_login {
            tracing::debug!(sender = %req.sender_login, "self-addressed recipient skipped");
            continue;
        }
        match state.policy.route(&req.sender_login, target)? {
            Route::Deliver(addr) => fanout.deliver(target, addr, false)?,
            Route::Skip(SkipReason::TargetOffline) => {
                fanout.persist(target, false)?;
                tracing::debug!(sender = %req.sender_login, %target, "recipient offline, stored only");
            }
            Route::Skip(reason) => {
                tracing::debug!(sender = %req.sender_login, %target, %reason, "delivery dropped");
            }
        }
    }

    tracing::debug!(
        sender = %req.sender_login,
        message_id = %fanout.message_id,
        delivered = fanout.outcome.pushes.len(),
        "message routed"
    );
    Ok(fanout.outcome)
}

pub fn get_history(state: &RelayState, req: HistoryRequest) -> HandlerResult {
    require_identity(state, &req.sender_login, "User not found")?;

    let rows = match req.contact_login.as_deref() {
        Some(GROUP_MARKER) => state.store.group_messages()?,
        Some(contact) if !is_blank(contact) => {
            require_identity(state, contact, "Contact not found")?;
            state.store.messages_between(&req.sender_login, contact)?
        }
        _ => state.store.messages_involving(&req.sender_login)?,
    };

    let entries: Vec<HistoryEntry> = rows.into_iter().map(history_entry).collect();
    Ok(Outcome::reply("").with_data(json!({ "Messages": entries })))
}

fn history_entry(row: StoredMessage) -> HistoryEntry {
    HistoryEntry {
        from: row.sender,
        to: if row.is_group {
            GROUP_MARKER.to_string()
        } else {
            row.receiver
        },
        text: row.text,
        timestamp: row.timestamp,
    }
}
