//! SQLite-backed [`DirectoryStore`].
//!
//! One connection behind a mutex: the relay handles one datagram at a time,
//! so there is no pool. WAL journal, foreign keys on, and a busy timeout so
//! a locked file turns into an error instead of a hang.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::directory::{
    AuditEntry, DirectoryStore, Identity, NewIdentity, NewMessage, Result, StoreError,
    StoredMessage,
};
use crate::migrations;

const IDENTITY_COLS: &str =
    "login, email, name, surname, birthday, salt, password_digest, created_at, online";
const MESSAGE_COLS: &str = "id, message_id, sender, receiver, text, timestamp, is_group";

pub struct SqliteDirectory {
    conn: Mutex<Connection>,
}

impl SqliteDirectory {
    /// Open (or create) the database file, creating parent directories.
    pub fn open(path: &Path, busy_timeout: Duration) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        tracing::info!(path = %path.display(), "opening directory database");
        let conn = Connection::open(path)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        })?;
        Self::init(conn, busy_timeout)
    }

    /// Private in-memory database. Used by tests.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?, Duration::from_secs(5))
    }

    fn init(conn: Connection, busy_timeout: Duration) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.busy_timeout(busy_timeout)?;
        migrations::run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Unavailable)
    }

    fn query_messages(
        &self,
        where_clause: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<StoredMessage>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {MESSAGE_COLS} FROM messages WHERE {where_clause} ORDER BY timestamp, id"
        ))?;
        let rows = stmt.query_map(params, row_to_message)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn query_logins(&self, sql: &str, arg: &str) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params![arg], |row| row.get(0))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn exists(&self, sql: &str, a: &str, b: &str) -> Result<bool> {
        let conn = self.conn()?;
        let found = conn
            .query_row(sql, params![a, b], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }

    fn find_identity_where(&self, column: &str, value: &str) -> Result<Option<Identity>> {
        let conn = self.conn()?;
        let identity = conn
            .query_row(
                &format!("SELECT {IDENTITY_COLS} FROM users WHERE {column} = ?1"),
                params![value],
                row_to_identity,
            )
            .optional()?;
        Ok(identity)
    }
}

impl DirectoryStore for SqliteDirectory {
    fn find_identity(&self, login: &str) -> Result<Option<Identity>> {
        self.find_identity_where("login", login)
    }

    fn find_identity_by_email(&self, email: &str) -> Result<Option<Identity>> {
        self.find_identity_where("email", email)
    }

    fn create_identity(&self, identity: NewIdentity) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO users
                 (login, email, name, surname, birthday, salt, password_digest, created_at, online)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0)",
            params![
                identity.login,
                identity.email,
                identity.name,
                identity.surname,
                identity.birthday.map(|d| d.format("%Y-%m-%d").to_string()),
                identity.salt,
                identity.password_digest,
                format_ts(&Utc::now()),
            ],
        )
        .map_err(constraint_to_conflict)?;
        Ok(())
    }

    fn set_online(&self, login: &str, online: bool) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE users SET online = ?2 WHERE login = ?1",
            params![login, online],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    fn is_blocked(&self, a: &str, b: &str) -> Result<bool> {
        self.exists(
            "SELECT 1 FROM blacklist
             WHERE (owner = ?1 AND blocked = ?2) OR (owner = ?2 AND blocked = ?1)
             LIMIT 1",
            a,
            b,
        )
    }

    fn contacts_of(&self, owner: &str) -> Result<Vec<String>> {
        self.query_logins(
            "SELECT contact FROM contacts WHERE owner = ?1 ORDER BY contact",
            owner,
        )
    }

    fn has_contact(&self, owner: &str, contact: &str) -> Result<bool> {
        self.exists(
            "SELECT 1 FROM contacts WHERE owner = ?1 AND contact = ?2",
            owner,
            contact,
        )
    }

    fn add_contact(&self, owner: &str, contact: &str) -> Result<bool> {
        let conn = self.conn()?;
        let inserted = conn
            .execute(
                "INSERT OR IGNORE INTO contacts (owner, contact) VALUES (?1, ?2)",
                params![owner, contact],
            )
            .map_err(constraint_to_conflict)?;
        Ok(inserted > 0)
    }

    fn remove_contact(&self, owner: &str, contact: &str) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM contacts WHERE owner = ?1 AND contact = ?2",
            params![owner, contact],
        )?;
        Ok(deleted > 0)
    }

    fn blacklist_of(&self, owner: &str) -> Result<Vec<String>> {
        self.query_logins(
            "SELECT blocked FROM blacklist WHERE owner = ?1 ORDER BY blocked",
            owner,
        )
    }

    fn has_blacklist_entry(&self, owner: &str, blocked: &str) -> Result<bool> {
        self.exists(
            "SELECT 1 FROM blacklist WHERE owner = ?1 AND blocked = ?2",
            owner,
            blocked,
        )
    }

    fn add_blacklist_entry(&self, owner: &str, blocked: &str) -> Result<bool> {
        let conn = self.conn()?;
        let inserted = conn
            .execute(
                "INSERT OR IGNORE INTO blacklist (owner, blocked) VALUES (?1, ?2)",
                params![owner, blocked],
            )
            .map_err(constraint_to_conflict)?;
        Ok(inserted > 0)
    }

    fn remove_blacklist_entry(&self, owner: &str, blocked: &str) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM blacklist WHERE owner = ?1 AND blocked = ?2",
            params![owner, blocked],
        )?;
        Ok(deleted > 0)
    }

    fn record_message(&self, message: NewMessage) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO messages (message_id, sender, receiver, text, timestamp, is_group)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                message.message_id,
                message.sender,
                message.receiver,
                message.text,
                format_ts(&message.timestamp),
                message.is_group,
            ],
        )
        .map_err(constraint_to_conflict)?;
        Ok(())
    }

    fn messages_between(&self, a: &str, b: &str) -> Result<Vec<StoredMessage>> {
        self.query_messages(
            "(sender = ?1 AND receiver = ?2) OR (sender = ?2 AND receiver = ?1)",
            params![a, b],
        )
    }

    fn group_messages(&self) -> Result<Vec<StoredMessage>> {
        self.query_messages(
            "id IN (SELECT MIN(id) FROM messages WHERE is_group = 1 GROUP BY message_id)",
            params![],
        )
    }

    fn messages_involving(&self, login: &str) -> Result<Vec<StoredMessage>> {
        self.query_messages(
            "receiver = ?1
             OR (sender = ?1 AND is_group = 0)
             OR id IN (SELECT MIN(id) FROM messages
                       WHERE sender = ?1 AND is_group = 1 GROUP BY message_id)",
            params![login],
        )
    }

    fn search_identities(&self, query: &str) -> Result<Vec<String>> {
        self.query_logins(
            "SELECT login FROM users WHERE instr(lower(login), lower(?1)) > 0 ORDER BY login",
            query,
        )
    }

    fn search_messages(&self, query: &str, sender: Option<&str>) -> Result<Vec<StoredMessage>> {
        // One hit per send, not per fan-out row.
        let dedup = "id IN (SELECT MIN(id) FROM messages GROUP BY message_id)";
        match sender {
            Some(sender) => self.query_messages(
                &format!("{dedup} AND instr(lower(text), lower(?1)) > 0 AND sender = ?2"),
                params![query, sender],
            ),
            None => self.query_messages(
                &format!("{dedup} AND instr(lower(text), lower(?1)) > 0"),
                params![query],
            ),
        }
    }

    fn record_audit(&self, login: &str, event: &str, timestamp: DateTime<Utc>) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO audit_log (login, event, timestamp) VALUES (?1, ?2, ?3)",
            params![login, event, format_ts(&timestamp)],
        )
        .map_err(constraint_to_conflict)?;
        Ok(())
    }

    fn audit_entries(&self, login: &str) -> Result<Vec<AuditEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT login, event, timestamp FROM audit_log WHERE login = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![login], |row| {
            Ok(AuditEntry {
                login: row.get(0)?,
                event: row.get(1)?,
                timestamp: parse_ts(2, row.get(2)?)?,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

// ── Row mapping ───────────────────────────────────────────────────────────────

/// Fixed-width UTC so lexical order is chronological order.
fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(idx: usize, s: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn row_to_identity(row: &rusqlite::Row<'_>) -> rusqlite::Result<Identity> {
    let birthday = row
        .get::<_, Option<String>>(4)?
        .map(|s| {
            NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
            })
        })
        .transpose()?;

    Ok(Identity {
        login: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        surname: row.get(3)?,
        birthday,
        salt: row.get(5)?,
        password_digest: row.get(6)?,
        created_at: parse_ts(7, row.get(7)?)?,
        online: row.get(8)?,
    })
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredMessage> {
    Ok(StoredMessage {
        id: row.get(0)?,
        message_id: row.get(1)?,
        sender: row.get(2)?,
        receiver: row.get(3)?,
        text: row.get(4)?,
        timestamp: parse_ts(5, row.get(5)?)?,
        is_group: row.get(6)?,
    })
}

fn constraint_to_conflict(e: rusqlite::Error) -> StoreError {
    match e {
        rusqlite::Error::SqliteFailure(err, msg)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            StoreError::Conflict(msg.unwrap_or_else(|| err.to_string()))
        }
        other => StoreError::Sqlite(other),
    }
}
