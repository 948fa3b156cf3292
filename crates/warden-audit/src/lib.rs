//! Append-only audit trail (§4.9), distinct from engineering logs emitted
//! via `tracing`: this is the domain-event record of what the system did,
//! not how it did it.

pub mod log;
pub mod service;

pub use log::{AuditLog, InMemoryAuditLog};
pub use service::AuditService;
