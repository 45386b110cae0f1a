//! SQLite store implementation
//!
//! This module provides a SQLite-based implementation of the Store trait.
//! TTL expiry is lazy: expired entries are dropped when read.

use crate::store::schema::initialize_schema;
use crate::store::traits::{Store, StoreResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::time::Duration;

/// SQLite store backend
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Creates a new SqliteStore instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStore)` - Successfully opened/created database
    /// * `Err(StoreError)` - Failed to open database
    pub fn new(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory store
    ///
    /// Useful for tests and one-shot CLI audits that need no persistence.
    pub fn new_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn expires_at(ttl: Option<Duration>) -> Option<String> {
        ttl.map(|d| {
            (Utc::now() + chrono::Duration::from_std(d).unwrap_or(chrono::Duration::zero()))
                .to_rfc3339()
        })
    }
}

impl Store for SqliteStore {
    fn get(&mut self, key: &str) -> StoreResult<Option<String>> {
        let row: Option<(String, Option<String>)> = self
            .conn
            .query_row(
                "SELECT value, expires_at FROM kv_entries WHERE key = ?1",
                params![key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match row {
            Some((value, expires_at)) => {
                if let Some(expiry) = expires_at {
                    let expired = DateTime::parse_from_rfc3339(&expiry)
                        .map(|t| t.with_timezone(&Utc) <= Utc::now())
                        .unwrap_or(true);

                    if expired {
                        self.conn
                            .execute("DELETE FROM kv_entries WHERE key = ?1", params![key])?;
                        return Ok(None);
                    }
                }
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    fn set(&mut self, key: &str, value: &str, ttl: Option<Duration>) -> StoreResult<()> {
        let now = Utc::now().to_rfc3339();
        let expires_at = Self::expires_at(ttl);

        self.conn.execute(
            "INSERT OR REPLACE INTO kv_entries (key, value, stored_at, expires_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![key, value, now, expires_at],
        )?;

        Ok(())
    }

    fn delete(&mut self, key: &str) -> StoreResult<bool> {
        let affected = self
            .conn
            .execute("DELETE FROM kv_entries WHERE key = ?1", params![key])?;
        Ok(affected > 0)
    }

    fn queue_push(&mut self, queue: &str, value: &str) -> StoreResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO queue_entries (queue, value, enqueued_at) VALUES (?1, ?2, ?3)",
            params![queue, value, now],
        )?;
        Ok(())
    }

    fn queue_pop(&mut self, queue: &str) -> StoreResult<Option<String>> {
        // Select and delete inside one transaction so a value is handed to
        // at most one popper.
        let tx = self.conn.transaction()?;

        let head: Option<(i64, String)> = tx
            .query_row(
                "SELECT id, value FROM queue_entries WHERE queue = ?1 ORDER BY id LIMIT 1",
                params![queue],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let result = match head {
            Some((id, value)) => {
                tx.execute("DELETE FROM queue_entries WHERE id = ?1", params![id])?;
                Some(value)
            }
            None => None,
        };

        tx.commit()?;
        Ok(result)
    }

    fn queue_len(&mut self, queue: &str) -> StoreResult<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM queue_entries WHERE queue = ?1",
            params![queue],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}
