//! chatrelay wire format — one JSON object per UDP datagram.
//!
//! Inbound datagrams are commands discriminated by a `Type` field. They are
//! decoded exactly once, at the dispatch boundary, into [`Command`]. Outbound
//! datagrams are either a [`Response`] to the sender of a command or a
//! [`Notification`] pushed to some other identity's registered address.
//!
//! Field names are PascalCase on the wire. Unknown fields are ignored.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Recipient value meaning "every other online identity".
pub const GROUP_MARKER: &str = "Group";

// ── Commands ──────────────────────────────────────────────────────────────────

/// A fully decoded inbound command. One variant per recognised `Type`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "Type")]
pub enum Command {
    Register(RegisterRequest),
    Login(LoginRequest),
    Logout(LogoutRequest),
    AddContact(ContactRequest),
    RemoveContact(ContactRequest),
    AddToBlacklist(ContactRequest),
    RemoveFromBlacklist(ContactRequest),
    GetContacts(OwnerRequest),
    GetBlacklist(OwnerRequest),
    SendMessage(SendMessageRequest),
    GetHistory(HistoryRequest),
    SearchContacts(SearchContactsRequest),
    SearchMessages(SearchMessagesRequest),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RegisterRequest {
    pub login: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub surname: Option<String>,
    pub password: String,
    pub password_confirm: String,
    /// `YYYY-MM-DD`.
    #[serde(default)]
    pub birthday: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LogoutRequest {
    pub login: String,
}

/// Shared by the contact and blacklist mutations.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContactRequest {
    pub owner_login: String,
    pub contact_login: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OwnerRequest {
    pub owner_login: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SendMessageRequest {
    pub sender_login: String,
    /// Individual logins and/or [`GROUP_MARKER`].
    pub recipients: Vec<String>,
    pub text: String,
    /// Stamped by the relay when absent.
    #[serde(default, with = "lenient_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HistoryRequest {
    pub sender_login: String,
    /// A login for one-to-one history, [`GROUP_MARKER`] for group history,
    /// absent for everything involving the sender.
    #[serde(default)]
    pub contact_login: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SearchContactsRequest {
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SearchMessagesRequest {
    pub query: String,
    #[serde(default)]
    pub sender_login: Option<String>,
}

/// Why an inbound datagram could not become a [`Command`].
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("datagram is not a JSON object with a string Type field")]
    MissingType,
    #[error("unknown command type {0:?}")]
    UnknownType(String),
    #[error("malformed {kind} command: {source}")]
    Malformed {
        kind: String,
        source: serde_json::Error,
    },
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "Type")]
    kind: String,
}

impl Command {
    /// Every `Type` value the relay understands.
    pub const TAGS: &'static [&'static str] = &[
        "Register",
        "Login",
        "Logout",
        "AddContact",
        "RemoveContact",
        "AddToBlacklist",
        "RemoveFromBlacklist",
        "GetContacts",
        "GetBlacklist",
        "SendMessage",
        "GetHistory",
        "SearchContacts",
        "SearchMessages",
    ];

    /// Decode one datagram. The envelope is read first so an unrecognised
    /// tag can be told apart from a recognised command with bad fields.
    pub fn decode(datagram: &[u8]) -> Result<Self, DecodeError> {
        let envelope: Envelope =
            serde_json::from_slice(datagram).map_err(|_| DecodeError::MissingType)?;

        if !Self::TAGS.contains(&envelope.kind.as_str()) {
            return Err(DecodeError::UnknownType(envelope.kind));
        }

        serde_json::from_slice(datagram).map_err(|source| DecodeError::Malformed {
            kind: envelope.kind,
            source,
        })
    }

    /// The `Type` tag this command was decoded from.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Register(_) => "Register",
            Self::Login(_) => "Login",
            Self::Logout(_) => "Logout",
            Self::AddContact(_) => "AddContact",
            Self::RemoveContact(_) => "RemoveContact",
            Self::AddToBlacklist(_) => "AddToBlacklist",
            Self::RemoveFromBlacklist(_) => "RemoveFromBlacklist",
            Self::GetContacts(_) => "GetContacts",
            Self::GetBlacklist(_) => "GetBlacklist",
            Self::SendMessage(_) => "SendMessage",
            Self::GetHistory(_) => "GetHistory",
            Self::SearchContacts(_) => "SearchContacts",
            Self::SearchMessages(_) => "SearchMessages",
        }
    }

    /// The `Type` carried by this command's response, e.g. `LoginResult`.
    pub fn result_type(&self) -> String {
        format!("{}Result", self.tag())
    }
}

// ── Responses ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Success,
    Fail,
}

/// Reply to the sender of a command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Response {
    #[serde(rename = "Type")]
    pub kind: String,
    pub status: Status,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl Response {
    pub fn success(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            status: Status::Success,
            message: message.into(),
            data: None,
        }
    }

    pub fn fail(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            status: Status::Fail,
            message: message.into(),
            data: None,
        }
    }

    /// A failure not tied to any particular command.
    pub fn error(message: impl Into<String>) -> Self {
        Self::fail("Error", message)
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }
}

/// Entry of a `GetHistory` result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HistoryEntry {
    pub from: String,
    pub to: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// Entry of a `SearchMessages` result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FoundMessage {
    pub from: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

// ── Notifications ─────────────────────────────────────────────────────────────

/// Asynchronous push to an online identity that did not send the datagram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "Type", rename_all_fields = "PascalCase")]
pub enum Notification {
    ReceiveMessage {
        from: String,
        text: String,
        timestamp: DateTime<Utc>,
    },
    UserOnline {
        login: String,
    },
    UserOffline {
        login: String,
    },
}

/// Anything the relay transmits.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Packet {
    Response(Response),
    Notification(Notification),
}

impl Packet {
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn type_name(&self) -> &str {
        match self {
            Self::Response(r) => &r.kind,
            Self::Notification(Notification::ReceiveMessage { .. }) => "ReceiveMessage",
            Self::Notification(Notification::UserOnline { .. }) => "UserOnline",
            Self::Notification(Notification::UserOffline { .. }) => "UserOffline",
        }
    }
}

impl From<Response> for Packet {
    fn from(r: Response) -> Self {
        Self::Response(r)
    }
}

impl From<Notification> for Packet {
    fn from(n: Notification) -> Self {
        Self::Notification(n)
    }
}

/// Accepts RFC 3339, or a bare `YYYY-MM-DDTHH:MM:SS[.fff]` taken as UTC.
mod lenient_timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let Some(s) = Option::<String>::deserialize(deserializer)? else {
            return Ok(None);
        };
        if let Ok(dt) = DateTime::parse_from_rfc3339(&s) {
            return Ok(Some(dt.with_timezone(&Utc)));
        }
        NaiveDateTime::parse_from_str(&s, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| Some(naive.and_utc()))
            .map_err(serde::de::Error::custom)
    }
}
