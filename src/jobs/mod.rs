//! Asynchronous audit job pipeline
//!
//! Jobs decouple slow, multi-page audits from their callers: a submission
//! creates a queued [`JobRecord`], the [`Worker`] claims it through the
//! store's exactly-once queue pop, and the caller polls the record for
//! status and results. Job kinds and payloads are typed end to end.

mod store;
mod types;
mod worker;

pub use store::{JobStore, PENDING_QUEUE};
pub use types::{
    AuditOptions, AuditReport, JobKind, JobPatch, JobRecord, JobStatus, PageAuditReport,
    SiteAuditReport,
};
pub use worker::Worker;
