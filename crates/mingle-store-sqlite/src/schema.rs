//! SQL schema for the Mingle SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS identities (
    identity_id     TEXT PRIMARY KEY,
    display_name    TEXT NOT NULL,
    email           TEXT NOT NULL UNIQUE,
    password_hash   TEXT NOT NULL,    -- argon2 PHC string
    code            TEXT NOT NULL UNIQUE,
    organization    TEXT,
    interests       TEXT NOT NULL DEFAULT '[]',   -- JSON string array
    facts           TEXT NOT NULL DEFAULT '[]',   -- JSON string array
    avatar_ref      TEXT,
    invitation_ref  TEXT,
    avatar_attempts INTEGER NOT NULL DEFAULT 0,
    created_at      TEXT NOT NULL     -- ISO 8601 UTC
);

-- One row per side of a relationship; the mirror row lives under the peer.
-- Rows are never deleted: disconnect flips the flag, reconnect flips it
-- back. The compound key makes a duplicate connect fail atomically.
CREATE TABLE IF NOT EXISTS connections (
    owner_id     TEXT NOT NULL REFERENCES identities(identity_id),
    peer_id      TEXT NOT NULL REFERENCES identities(identity_id),
    disconnected INTEGER NOT NULL DEFAULT 0,
    created_at   TEXT NOT NULL,
    PRIMARY KEY (owner_id, peer_id),
    CHECK (owner_id != peer_id)
);

-- One-directional 'want to meet' markers. Unpaired by design; 'who
-- signaled me' is answered by the peer_id index, not a stored edge.
CREATE TABLE IF NOT EXISTS interest_signals (
    owner_id   TEXT NOT NULL REFERENCES identities(identity_id),
    peer_id    TEXT NOT NULL REFERENCES identities(identity_id),
    created_at TEXT NOT NULL,
    PRIMARY KEY (owner_id, peer_id)
);

CREATE INDEX IF NOT EXISTS connections_peer_idx      ON connections(peer_id);
CREATE INDEX IF NOT EXISTS interest_signals_peer_idx ON interest_signals(peer_id);

PRAGMA user_version = 1;
";
