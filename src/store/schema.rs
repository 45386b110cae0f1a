//! SQLite schema for the store backend

use rusqlite::Connection;

/// Initializes the store schema
///
/// Creates the key/value and queue tables if they do not already exist.
pub fn initialize_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS kv_entries (
            key        TEXT PRIMARY KEY,
            value      TEXT NOT NULL,
            stored_at  TEXT NOT NULL,
            expires_at TEXT
        );

        CREATE TABLE IF NOT EXISTS queue_entries (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            queue       TEXT NOT NULL,
            value       TEXT NOT NULL,
            enqueued_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_queue_entries_queue
            ON queue_entries (queue, id);
        ",
    )
}
