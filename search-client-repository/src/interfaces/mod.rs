//! Interface definitions for the remote service and diagnostics.
//!
//! These traits allow for dependency injection: the connection is written
//! against `SearchService` and `DiagnosticSink`, and tests swap in
//! in-memory implementations.

mod diagnostic_sink;
mod search_service;

pub use diagnostic_sink::{DiagnosticEvent, DiagnosticSink, NoopSink, Severity, TracingSink};
pub use search_service::SearchService;
