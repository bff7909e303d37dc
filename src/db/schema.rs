//! Database schema and migrations for filedrop.
//!
//! Migrations are applied sequentially; the `schema_version` table tracks
//! which have already run.

/// Database migrations (SQLite flavor).
#[cfg(feature = "sqlite")]
pub const MIGRATIONS: &[&str] = &[
    // v1: users table
    r#"
CREATE TABLE users (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    username    TEXT NOT NULL UNIQUE,
    password    TEXT NOT NULL,           -- Argon2 hash
    created_at  TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX idx_users_username ON users(username);
"#,
    // v2: files table, the metadata source of truth
    r#"
CREATE TABLE files (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    owner_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    name         TEXT NOT NULL,
    size         INTEGER NOT NULL,
    content_type TEXT NOT NULL,
    locator      TEXT NOT NULL,          -- backend-specific, immutable
    is_public    INTEGER NOT NULL DEFAULT 0,
    share_token  TEXT UNIQUE,            -- set iff is_public
    expires_at   TEXT,                   -- share expiry horizon
    created_at   TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at   TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX idx_files_owner_id ON files(owner_id);
CREATE INDEX idx_files_share_token ON files(share_token);
CREATE INDEX idx_files_expires_at ON files(expires_at);
"#,
];

/// Database migrations (PostgreSQL flavor).
#[cfg(all(feature = "postgres", not(feature = "sqlite")))]
pub const MIGRATIONS: &[&str] = &[
    // v1: users table
    r#"
CREATE TABLE users (
    id          BIGSERIAL PRIMARY KEY,
    username    TEXT NOT NULL UNIQUE,
    password    TEXT NOT NULL,
    created_at  TEXT NOT NULL DEFAULT TO_CHAR(NOW() AT TIME ZONE 'UTC', 'YYYY-MM-DD HH24:MI:SS')
);

CREATE INDEX idx_users_username ON users(username);
"#,
    // v2: files table, the metadata source of truth
    r#"
CREATE TABLE files (
    id           BIGSERIAL PRIMARY KEY,
    owner_id     BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    name         TEXT NOT NULL,
    size         BIGINT NOT NULL,
    content_type TEXT NOT NULL,
    locator      TEXT NOT NULL,
    is_public    BOOLEAN NOT NULL DEFAULT FALSE,
    share_token  TEXT UNIQUE,
    expires_at   TEXT,
    created_at   TEXT NOT NULL DEFAULT TO_CHAR(NOW() AT TIME ZONE 'UTC', 'YYYY-MM-DD HH24:MI:SS'),
    updated_at   TEXT NOT NULL DEFAULT TO_CHAR(NOW() AT TIME ZONE 'UTC', 'YYYY-MM-DD HH24:MI:SS')
);

CREATE INDEX idx_files_owner_id ON files(owner_id);
CREATE INDEX idx_files_share_token ON files(share_token);
CREATE INDEX idx_files_expires_at ON files(expires_at);
"#,
];
