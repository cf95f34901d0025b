//! SQL schema for the usermirror SQLite store.
//!
//! Executed once at connection startup. `PRAGMA user_version` records the
//! layout; there is no migration path beyond it.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- One row per identity-provider user. Every write replaces the whole row.
CREATE TABLE IF NOT EXISTS users (
    user_id              TEXT PRIMARY KEY,
    email                TEXT,
    email_verified       INTEGER,          -- 0 | 1 | NULL
    username             TEXT,
    blocked              INTEGER,          -- 0 | 1 | NULL
    family_name          TEXT,
    given_name           TEXT,
    name                 TEXT,
    nickname             TEXT,
    phone_number         TEXT,
    phone_verified       INTEGER,          -- 0 | 1 | NULL
    created_at           TEXT,             -- as sent by the provider
    updated_at           TEXT,             -- as sent by the provider
    picture              TEXT,
    user_metadata        TEXT,             -- JSON object or NULL
    app_metadata         TEXT,             -- JSON object or NULL
    identities           TEXT,             -- JSON array or NULL
    raw_user             TEXT NOT NULL,    -- full payload, verbatim
    last_event_processed TEXT NOT NULL     -- RFC 3339 UTC
);

PRAGMA user_version = 1;
";

/// Column list shared by the upsert and the lookup, in bind order.
pub const USER_COLUMNS: &str = "
    user_id, email, email_verified, username, blocked,
    family_name, given_name, name, nickname,
    phone_number, phone_verified, created_at, updated_at, picture,
    user_metadata, app_metadata, identities, raw_user, last_event_processed";
