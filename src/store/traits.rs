//! Store trait and error types

use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Trait for key/value store backends with queue support
///
/// Implementations must provide per-key atomic writes (a set never
/// partially overwrites a concurrent set; last-writer-wins is acceptable)
/// and an exactly-once `queue_pop`: a value pushed onto a queue is returned
/// to at most one concurrent caller.
pub trait Store: Send {
    // ===== Key/value records =====

    /// Gets a value by key
    ///
    /// Entries past their TTL are treated as absent.
    fn get(&mut self, key: &str) -> StoreResult<Option<String>>;

    /// Sets a value, optionally with a time-to-live
    ///
    /// A `ttl` of `None` means the entry does not expire.
    fn set(&mut self, key: &str, value: &str, ttl: Option<Duration>) -> StoreResult<()>;

    /// Deletes a key, returning whether it existed
    fn delete(&mut self, key: &str) -> StoreResult<bool>;

    // ===== Queues =====

    /// Appends a value to the tail of a named queue
    fn queue_push(&mut self, queue: &str, value: &str) -> StoreResult<()>;

    /// Atomically removes and returns the value at the head of a queue
    ///
    /// Returns `None` when the queue is empty. A given value is returned to
    /// at most one concurrent caller.
    fn queue_pop(&mut self, queue: &str) -> StoreResult<Option<String>>;

    /// Returns the number of values currently in a queue
    fn queue_len(&mut self, queue: &str) -> StoreResult<usize>;
}

/// Shared handle to a store backend
///
/// The store is the only resource shared across concurrent job executions;
/// everything else in the pipeline is private to a single job.
pub type SharedStore = Arc<Mutex<dyn Store>>;
