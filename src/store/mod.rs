//! Store module
//!
//! Durable key/value records with optional TTL plus an atomic FIFO queue,
//! behind the [`Store`] trait. Job records, the pending-job queue, and
//! cached audit artifacts all live here. The queue pop is the one
//! correctness-critical atomic operation in the pipeline: a pushed value is
//! handed to at most one concurrent popper.

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStore;
pub use traits::{SharedStore, Store, StoreError, StoreResult};
