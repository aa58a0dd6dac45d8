//! SQL schema for the Courier SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- The identity provider's view of users. Courier only writes last_active.
CREATE TABLE IF NOT EXISTS users (
    user_id        TEXT PRIMARY KEY,
    username       TEXT NOT NULL UNIQUE,
    password_hash  TEXT,             -- argon2 PHC string; NULL = cannot log in
    last_active    TEXT,
    created_at     TEXT NOT NULL
);

-- Symmetric friendships are stored as two directed rows.
CREATE TABLE IF NOT EXISTS friendships (
    user_id    TEXT NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    friend_id  TEXT NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    PRIMARY KEY (user_id, friend_id),
    CHECK (user_id != friend_id)
);

CREATE TABLE IF NOT EXISTS blocks (
    blocker_id TEXT NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    blocked_id TEXT NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    PRIMARY KEY (blocker_id, blocked_id)
);

-- Only is_read/seen_at are ever updated. Rows are hard-deleted by sender.
CREATE TABLE IF NOT EXISTS messages (
    message_id        INTEGER PRIMARY KEY AUTOINCREMENT,
    sender_id         TEXT NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    receiver_id       TEXT NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    content           TEXT NOT NULL DEFAULT '',
    image_url         TEXT,
    video_url         TEXT,
    voice_note_url    TEXT,
    created_at        TEXT NOT NULL,   -- ISO 8601 UTC; server-assigned
    is_read           INTEGER NOT NULL DEFAULT 0,
    seen_at           TEXT,
    is_system_message INTEGER NOT NULL DEFAULT 0,
    reply_to          INTEGER REFERENCES messages(message_id) ON DELETE SET NULL,
    CHECK ((is_read = 0) = (seen_at IS NULL))
);

-- Only is_read is ever updated.
CREATE TABLE IF NOT EXISTS notifications (
    notification_id INTEGER PRIMARY KEY AUTOINCREMENT,
    recipient_id    TEXT NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    sender_id       TEXT NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    kind            TEXT NOT NULL,
    content         TEXT,
    related_id      TEXT,
    created_at      TEXT NOT NULL,
    is_read         INTEGER NOT NULL DEFAULT 0,
    CHECK (recipient_id != sender_id)
);

CREATE INDEX IF NOT EXISTS messages_pair_idx     ON messages(sender_id, receiver_id, message_id);
CREATE INDEX IF NOT EXISTS messages_unread_idx   ON messages(receiver_id, is_read);
CREATE INDEX IF NOT EXISTS messages_reply_idx    ON messages(reply_to);
CREATE INDEX IF NOT EXISTS notifications_rcpt_idx ON notifications(recipient_id, is_read);

PRAGMA user_version = 1;
";
