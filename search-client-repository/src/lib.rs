//! # Search Client Repository
//!
//! This crate maps typed documents onto the indexes of a remote search
//! service. It includes the index registry, the lazily built client handle,
//! index administration, batch mutation, direct and deferred search, and a
//! concrete service implementation for OpenSearch.

pub mod batch;
pub mod config;
pub mod connection;
pub mod errors;
pub mod interfaces;
pub mod lifecycle;
pub mod opensearch;
pub mod query;
pub mod registry;
pub mod retry;
pub mod types;

pub use batch::{BatchReport, IndexBatch, IndexingResult, MutationKind, MutationSet, Outcome};
pub use config::{ConnectionConfig, IndexTarget};
pub use connection::SearchConnection;
pub use errors::SearchError;
pub use interfaces::{DiagnosticEvent, DiagnosticSink, NoopSink, SearchService, Severity, TracingSink};
pub use lifecycle::{ClientLifecycle, ServiceFactory};
pub use opensearch::OpenSearchService;
pub use query::{Expression, Query, QueryOperator, QueryProvider};
pub use registry::IndexRegistry;
pub use retry::{RetryPolicy, RetryingService};
pub use types::{IndexDefinition, ServiceResponse};

pub use tokio_util::sync::CancellationToken;
