//! `SQLite` schema definitions for timetable storage.
//!
//! Each user owns one row holding their whole item list as a JSON array.

/// SQL statement to create the timetables table.
pub const CREATE_TIMETABLES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS timetables (
    user_id TEXT PRIMARY KEY,
    items TEXT NOT NULL DEFAULT '[]',
    updated_at TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
)
";

/// SQL statement to create an index on `updated_at` for recency queries.
pub const CREATE_UPDATED_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_timetables_updated ON timetables(updated_at DESC)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// SQL statement adding the per-row write counter (schema version 2).
pub const ADD_REVISION_COLUMN: &str = r"
ALTER TABLE timetables ADD COLUMN revision INTEGER NOT NULL DEFAULT 0
";

/// Base schema statements in order. Later versions are applied as migrations.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_TIMETABLES_TABLE,
    CREATE_UPDATED_INDEX,
    CREATE_METADATA_TABLE,
];
