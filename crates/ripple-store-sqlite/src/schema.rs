//! SQL schema for the Ripple SQLite store.
//!
//! Applied on every connection open; idempotent thanks to
//! `CREATE TABLE IF NOT EXISTS`. `PRAGMA user_version` records the schema
//! revision so future migrations have something to gate on.

/// Full schema DDL.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Actions are immutable after insertion. The only write ever issued against
-- an existing row is an explicit administrative DELETE.
CREATE TABLE IF NOT EXISTS actions (
    action_id    TEXT PRIMARY KEY,
    actor_kind   TEXT NOT NULL,
    actor_id     TEXT NOT NULL,   -- normalized string identifier
    verb         TEXT NOT NULL,
    description  TEXT,
    subject_kind TEXT,
    subject_id   TEXT,
    target_kind  TEXT,
    target_id    TEXT,
    public       INTEGER NOT NULL DEFAULT 1,
    data         TEXT,            -- JSON extension payload or NULL
    created_at   TEXT NOT NULL    -- fixed-width RFC 3339 UTC; server-assigned
);

CREATE TABLE IF NOT EXISTS follows (
    follow_id    TEXT PRIMARY KEY,
    watcher_kind TEXT NOT NULL,
    watcher_id   TEXT NOT NULL,
    subject_kind TEXT NOT NULL,
    subject_id   TEXT NOT NULL,
    started_at   TEXT NOT NULL,
    UNIQUE (watcher_kind, watcher_id, subject_kind, subject_id)
);

-- The entity directory: one row per referenceable entity. Backs the
-- per-kind bulk fetchers registered with the entity registry.
CREATE TABLE IF NOT EXISTS entities (
    kind    TEXT NOT NULL,
    id      TEXT NOT NULL,
    display TEXT NOT NULL,
    data    TEXT NOT NULL DEFAULT '{}',
    PRIMARY KEY (kind, id)
);

CREATE INDEX IF NOT EXISTS actions_actor_idx   ON actions(actor_kind, actor_id);
CREATE INDEX IF NOT EXISTS actions_subject_idx ON actions(subject_kind, subject_id);
CREATE INDEX IF NOT EXISTS actions_created_idx ON actions(created_at);
CREATE INDEX IF NOT EXISTS follows_watcher_idx ON follows(watcher_kind, watcher_id);

PRAGMA user_version = 1;
";
