//! SearchContacts and SearchMessages.

use chatrelay_core::wire::{FoundMessage, SearchContactsRequest, SearchMessagesRequest};
use serde_json::json;

use super::{is_blank, require_identity, HandlerResult, Outcome, RelayState};
use crate::error::CommandError;

pub fn search_contacts(state: &RelayState, req: SearchContactsRequest) -> HandlerResult {
    if is_blank(&req.query) {
        return Err(CommandError::validation("Search query is empty"));
    }
    let results = state.store.search_identities(req.query.trim())?;
    Ok(Outcome::reply("").with_data(json!({ "Results": results })))
}

pub fn search_messages(state: &RelayState, req: SearchMessagesRequest) -> HandlerResult {
    if is_blank(&req.query) {
        return Err(CommandError::validation("Search query is empty"));
    }
    let sender = req.sender_login.as_deref().filter(|s| !is_blank(s));
    if let Some(sender) = sender {
        require_identity(state, sender, "User not found")?;
    }

    let found: Vec<FoundMessage> = state
        .store
        .search_messages(req.query.trim(), sender)?
        .into_iter()
        .map(|m| FoundMessage {
            from: m.sender,
            text: m.text,
            timestamp: m.timestamp,
        })
        .collect();
    Ok(Outcome::reply("").with_data(json!({ "Messages": found })))
}
