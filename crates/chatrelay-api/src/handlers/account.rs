//! Register, Login, Logout.

use std::net::SocketAddr;

use chatrelay_core::wire::{LoginRequest, LogoutRequest, RegisterRequest};
use chatrelay_core::{Notification, GROUP_MARKER};
use chatrelay_services::{NewIdentity, Route, StoreError};
use chrono::Utc;

use super::{is_blank, HandlerResult, Outcome, RelayState};
use crate::error::CommandError;

const BAD_CREDENTIALS: &str = "Invalid login or password";

pub fn register(state: &RelayState, req: RegisterRequest) -> HandlerResult {
    if is_blank(&req.login) || is_blank(&req.email) || is_blank(&req.password) {
        return Err(CommandError::validation(
            "Login, email and password are required",
        ));
    }
    if req.login == GROUP_MARKER {
        return Err(CommandError::validation("This login is reserved"));
    }
    if req.password != req.password_confirm {
        return Err(CommandError::validation("Passwords do not match"));
    }
    if req.password.chars().count() < state.min_password_len {
        return Err(CommandError::validation(format!(
            "Password must be at least {} characters",
            state.min_password_len
        )));
    }
    if !req.email.contains('@') || req.email.chars().count() < 5 {
        return Err(CommandError::validation("Invalid email format"));
    }
    if state.store.find_identity(&req.login)?.is_some() {
        return Err(CommandError::conflict("Login is already taken"));
    }
    if state.store.find_identity_by_email(&req.email)?.is_some() {
        return Err(CommandError::conflict("Email is already in use"));
    }

    let hash = state.auth.hash(&req.password)?;
    let created = state.store.create_identity(NewIdentity {
        login: req.login.clone(),
        email: req.email,
        name: req.name,
        surname: req.surname,
        birthday: req.birthday,
        salt: hash.salt,
        password_digest: hash.digest,
    });
    match created {
        Ok(()) => {}
        // Lost a race with another registration between the checks and the insert.
        Err(StoreError::Conflict(_)) => {
            return Err(CommandError::conflict("A user with these details already exists"))
        }
        Err(e) => return Err(e.into()),
    }

    tracing::info!(login = %req.login, "account registered");
    Ok(Outcome::reply("Registration successful"))
}

pub fn login(state: &RelayState, req: LoginRequest, src: SocketAddr) -> HandlerResult {
    let Some(identity) = state.store.find_identity(&req.login)? else {
        return Err(CommandError::denied(BAD_CREDENTIALS));
    };
    if !state
        .auth
        .verify(&req.password, &identity.salt, &identity.password_digest)
    {
        tracing::debug!(login = %req.login, %src, "password rejected");
        return Err(CommandError::denied(BAD_CREDENTIALS));
    }

    // Fan-out first: a store failure here must leave presence untouched.
    let mut outcome = Outcome::reply("Login successful");
    notify_contacts(state, &identity.login, &mut outcome, |login| {
        Notification::UserOnline { login }
    })?;

    if let Some(previous) = state.presence.set(&identity.login, src) {
        if previous != src {
            tracing::info!(login = %identity.login, %previous, current = %src, "session moved");
        }
    }
    mirror(state, &identity.login, true, "Login");

    tracing::info!(login = %identity.login, %src, "user logged in");
    tracing::debug!(online = ?state.presence.snapshot(), "online users");
    Ok(outcome)
}

pub fn logout(state: &RelayState, req: LogoutRequest) -> HandlerResult {
    let Some(session) = state.presence.entry(&req.login) else {
        return Err(CommandError::denied("User is not logged in"));
    };

    let mut outcome = Outcome::reply("Logout successful");
    notify_contacts(state, &req.login, &mut outcome, |login| {
        Notification::UserOffline { login }
    })?;

    state.presence.remove(&req.login);
    mirror(state, &req.login, false, "Logout");

    let online_for = Utc::now().signed_duration_since(session.since);
    tracing::info!(
        login = %req.login,
        addr = %session.addr,
        online_secs = online_for.num_seconds(),
        "user logged out"
    );
    tracing::debug!(online = ?state.presence.snapshot(), "online users");
    Ok(outcome)
}

/// Online flag and audit trail. Presence has already changed by the time
/// this runs, so store trouble here is logged rather than failing the
/// command.
fn mirror(state: &RelayState, login: &str, online: bool, event: &str) {
    if let Err(e) = state.store.set_online(login, online) {
        tracing::error!(%login, error = %e, "failed to mirror online flag");
    }
    if let Err(e) = state.store.record_audit(login, event, Utc::now()) {
        tracing::error!(%login, %event, error = %e, "failed to record audit entry");
    }
}

/// Push a presence change to every deliverable contact of `login`.
fn notify_contacts(
    state: &RelayState,
    login: &str,
    outcome: &mut Outcome,
    make: impl Fn(String) -> Notification,
) -> Result<(), CommandError> {
    for contact in state.store.contacts_of(login)? {
        match state.policy.route(login, &contact)? {
            Route::Deliver(addr) => outcome.push(addr, make(login.to_string())),
            Route::Skip(reason) => {
                tracing::debug!(%login, %contact, %reason, "presence notification skipped");
            }
        }
    }
    Ok(())
}
