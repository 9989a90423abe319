//! SQLite DDL for the content table.

use rusqlite::Connection;

/// Uses `IF NOT EXISTS` throughout so `apply_schema` is idempotent.
pub(crate) const SCHEMA_SQL: &str = r#"
PRAGMA journal_mode = WAL;

-- AUTOINCREMENT keeps surrogate ids from ever being reused.
CREATE TABLE IF NOT EXISTS contents (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    provider         TEXT    NOT NULL,
    provider_id      TEXT    NOT NULL,
    kind             TEXT    NOT NULL,      -- 'video' | 'text', immutable
    title            TEXT    NOT NULL DEFAULT '',
    description      TEXT    NOT NULL DEFAULT '',
    url              TEXT    NOT NULL DEFAULT '',
    tags             TEXT    NOT NULL DEFAULT '',
    language         TEXT    NOT NULL DEFAULT '',
    views            INTEGER NOT NULL DEFAULT 0,
    likes            INTEGER NOT NULL DEFAULT 0,
    duration         INTEGER NOT NULL DEFAULT 0,
    reading_time     INTEGER NOT NULL DEFAULT 0,
    reactions        INTEGER NOT NULL DEFAULT 0,
    base_score       REAL    NOT NULL DEFAULT 0,
    type_multiplier  REAL    NOT NULL DEFAULT 1,
    freshness_score  REAL    NOT NULL DEFAULT 0,
    engagement_score REAL    NOT NULL DEFAULT 0,
    final_score      REAL    NOT NULL DEFAULT 0,
    published_at     TEXT    NOT NULL,
    created_at       TEXT    NOT NULL,
    updated_at       TEXT    NOT NULL,
    deleted_at       TEXT
);

-- One live row per identity; soft-deleted rows drop out of the constraint.
CREATE UNIQUE INDEX IF NOT EXISTS idx_contents_identity
    ON contents(provider, provider_id) WHERE deleted_at IS NULL;
CREATE INDEX IF NOT EXISTS idx_contents_final_score ON contents(final_score DESC);
CREATE INDEX IF NOT EXISTS idx_contents_deleted_at  ON contents(deleted_at);
"#;

pub(crate) fn apply_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)
}
