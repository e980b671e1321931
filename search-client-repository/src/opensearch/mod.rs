//! OpenSearch implementation of the search service.
//!
//! This module provides a concrete implementation of `SearchService`
//! using OpenSearch as the backend.

mod bulk;
mod client;
mod index_config;
mod queries;

pub use client::OpenSearchService;
pub use index_config::get_index_body;
pub use queries::build_search_body;
