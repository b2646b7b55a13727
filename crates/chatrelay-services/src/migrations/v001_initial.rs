//! v001: accounts, contacts, blacklist, messages, audit log.

use rusqlite::Connection;

const UP_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    login           TEXT PRIMARY KEY NOT NULL,
    email           TEXT NOT NULL UNIQUE COLLATE NOCASE,
    name            TEXT,
    surname         TEXT,
    birthday        TEXT,                       -- YYYY-MM-DD
    salt            TEXT NOT NULL,              -- base64
    password_digest TEXT NOT NULL,              -- base64
    created_at      TEXT NOT NULL,              -- RFC 3339
    online          INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS contacts (
    owner   TEXT NOT NULL REFERENCES users(login) ON DELETE CASCADE,
    contact TEXT NOT NULL REFERENCES users(login) ON DELETE CASCADE,
    PRIMARY KEY (owner, contact)
);

CREATE TABLE IF NOT EXISTS blacklist (
    owner   TEXT NOT NULL REFERENCES users(login) ON DELETE CASCADE,
    blocked TEXT NOT NULL REFERENCES users(login) ON DELETE CASCADE,
    PRIMARY KEY (owner, blocked)
);

CREATE INDEX IF NOT EXISTS idx_blacklist_blocked ON blacklist(blocked);

-- A group send fans out into one row per recipient sharing message_id.
CREATE TABLE IF NOT EXISTS messages (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    message_id TEXT NOT NULL,
    sender     TEXT NOT NULL REFERENCES users(login),
    receiver   TEXT NOT NULL REFERENCES users(login),
    text       TEXT NOT NULL,
    timestamp  TEXT NOT NULL,                   -- RFC 3339, UTC, fixed width
    is_group   INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_messages_timestamp ON messages(timestamp);
CREATE INDEX IF NOT EXISTS idx_messages_pair ON messages(sender, receiver);
CREATE INDEX IF NOT EXISTS idx_messages_message_id ON messages(message_id);

CREATE TABLE IF NOT EXISTS audit_log (
    id        INTEGER PRIMARY KEY AUTOINCREMENT,
    login     TEXT NOT NULL REFERENCES users(login),
    event     TEXT NOT NULL,
    timestamp TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_audit_login ON audit_log(login);
"#;

pub fn up(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(UP_SQL)
}
