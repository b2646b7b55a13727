//! chatrelay-api — turns one inbound datagram into the datagrams it causes.
//!
//! [`Dispatcher::handle`] decodes the datagram once into a
//! [`Command`], runs the matching handler and returns every outbound packet:
//! the reply to the source address first (unless the command is silent on
//! success), then any pushes to other identities. It never fails; every
//! error becomes a `Fail` response.

pub mod error;
pub mod handlers;

use std::net::SocketAddr;

use chatrelay_core::{Command, DecodeError, Packet, Response};

pub use error::CommandError;
pub use handlers::RelayState;

use handlers::{account, contacts, messages, search, HandlerResult};

/// One datagram to transmit.
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub addr: SocketAddr,
    pub packet: Packet,
}

impl Outbound {
    pub fn new(addr: SocketAddr, packet: impl Into<Packet>) -> Self {
        Self {
            addr,
            packet: packet.into(),
        }
    }
}

pub struct Dispatcher {
    state: RelayState,
}

impl Dispatcher {
    pub fn new(state: RelayState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &RelayState {
        &self.state
    }

    /// Interpret one datagram from `src`.
    pub fn handle(&self, datagram: &[u8], src: SocketAddr) -> Vec<Outbound> {
        let command = match Command::decode(datagram) {
            Ok(command) => command,
            Err(DecodeError::UnknownType(kind)) => {
                tracing::warn!(%src, %kind, "unknown command");
                return vec![Outbound::new(src, Response::error("Unknown command"))];
            }
            Err(e) => {
                tracing::warn!(%src, error = %e, "malformed request");
                return vec![Outbound::new(src, Response::error("Malformed request"))];
            }
        };

        let tag = command.tag();
        let result_type = command.result_type();
        tracing::debug!(%src, command = tag, "dispatching");

        match self.run(command, src) {
            Ok(outcome) => {
                let mut out = Vec::with_capacity(outcome.pushes.len() + 1);
                if let Some(message) = outcome.message {
                    let mut response = Response::success(result_type, message);
                    if let Some(data) = outcome.data {
                        response = response.with_data(data);
                    }
                    out.push(Outbound::new(src, response));
                }
                out.extend(outcome.pushes);
                out
            }
            Err(e) => {
                if e.is_internal() {
                    tracing::error!(%src, command = tag, error = %e, "command failed");
                } else {
                    tracing::debug!(%src, command = tag, reason = %e, "command rejected");
                }
                vec![Outbound::new(
                    src,
                    Response::fail(result_type, e.reply_message()),
                )]
            }
        }
    }

    fn run(&self, command: Command, src: SocketAddr) -> HandlerResult {
        let state = &self.state;
        match command {
            Command::Register(req) => account::register(state, req),
            Command::Login(req) => account::login(state, req, src),
            Command::Logout(req) => account::logout(state, req),
            Command::AddContact(req) => contacts::add_contact(state, req),
            Command::RemoveContact(req) => contacts::remove_contact(state, req),
            Command::AddToBlacklist(req) => contacts::add_to_blacklist(state, req),
            Command::RemoveFromBlacklist(req) => contacts::remove_from_blacklist(state, req),
            Command::GetContacts(req) => contacts::get_contacts(state, req),
            Command::GetBlacklist(req) => contacts::get_blacklist(state, req),
            Command::SendMessage(req) => messages::send_message(state, req),
            Command::GetHistory(req) => messages::get_history(state, req),
            Command::SearchContacts(req) => search::search_contacts(state, req),
            Command::SearchMessages(req) => search::search_messages(state, req),
        }
    }
}
