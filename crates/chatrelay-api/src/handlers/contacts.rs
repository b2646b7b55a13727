//! Contact list and blacklist mutations and queries.

use chatrelay_core::wire::{ContactRequest, OwnerRequest};
use serde_json::json;

use super::{is_blank, require_identity, HandlerResult, Outcome, RelayState};
use crate::error::CommandError;

const PAIR_NOT_FOUND: &str = "User or contact not found";

/// Shape and existence checks shared by every two-party command.
fn check_pair(state: &RelayState, req: &ContactRequest, self_reason: &str) -> Result<(), CommandError> {
    if is_blank(&req.owner_login) || is_blank(&req.contact_login) {
        return Err(CommandError::validation("OwnerLogin and ContactLogin are required"));
    }
    if req.owner_login == req.contact_login {
        return Err(CommandError::validation(self_reason));
    }
    require_identity(state, &req.owner_login, PAIR_NOT_FOUND)?;
    require_identity(state, &req.contact_login, PAIR_NOT_FOUND)?;
    Ok(())
}

pub fn add_contact(state: &RelayState, req: ContactRequest) -> HandlerResult {
    check_pair(state, &req, "You cannot add yourself as a contact")?;

    if state.store.is_blocked(&req.owner_login, &req.contact_login)? {
        return Err(CommandError::denied("This user is blacklisted"));
    }
    if state.store.has_contact(&req.owner_login, &req.contact_login)?
        || !state.store.add_contact(&req.owner_login, &req.contact_login)?
    {
        return Err(CommandError::conflict("Contact already exists"));
    }

    tracing::info!(owner = %req.owner_login, contact = %req.contact_login, "contact added");
    Ok(Outcome::reply("Contact added"))
}

pub fn remove_contact(state: &RelayState, req: ContactRequest) -> HandlerResult {
    check_pair(state, &req, "You cannot remove yourself as a contact")?;

    if !state.store.remove_contact(&req.owner_login, &req.contact_login)? {
        return Err(CommandError::not_found("Contact not found"));
    }

    tracing::info!(owner = %req.owner_login, contact = %req.contact_login, "contact removed");
    Ok(Outcome::reply("Contact removed"))
}

pub fn add_to_blacklist(state: &RelayState, req: ContactRequest) -> HandlerResult {
    check_pair(state, &req, "You cannot blacklist yourself")?;

    if state
        .store
        .has_blacklist_entry(&req.owner_login, &req.contact_login)?
        || !state
            .store
            .add_blacklist_entry(&req.owner_login, &req.contact_login)?
    {
        return Err(CommandError::conflict("User is already blacklisted"));
    }

    tracing::info!(owner = %req.owner_login, blocked = %req.contact_login, "user blacklisted");
    Ok(Outcome::reply("User added to blacklist"))
}

pub fn remove_from_blacklist(state: &RelayState, req: ContactRequest) -> HandlerResult {
    check_pair(state, &req, "You cannot blacklist yourself")?;

    if !state
        .store
        .remove_blacklist_entry(&req.owner_login, &req.contact_login)?
    {
        return Err(CommandError::not_found("User is not blacklisted"));
    }

    tracing::info!(owner = %req.owner_login, unblocked = %req.contact_login, "user removed from blacklist");
    Ok(Outcome::reply("User removed from blacklist"))
}

pub fn get_contacts(state: &RelayState, req: OwnerRequest) -> HandlerResult {
    require_identity(state, &req.owner_login, "User not found")?;
    let contacts = state.store.contacts_of(&req.owner_login)?;
    Ok(Outcome::reply("").with_data(json!({ "Contacts": contacts })))
}

pub fn get_blacklist(state: &RelayState, req: OwnerRequest) -> HandlerResult {
    require_identity(state, &req.owner_login, "User not found")?;
    let blocked = state.store.blacklist_of(&req.owner_login)?;
    Ok(Outcome::reply("").with_data(json!({ "Blacklist": blocked })))
}
