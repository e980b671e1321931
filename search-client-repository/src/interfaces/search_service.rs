//! Remote search service trait definition.
//!
//! This module defines the protocol calls the connection issues against the
//! remote service, allowing for different backend implementations
//! (OpenSearch, in-memory fakes, etc.).

use async_trait::async_trait;

use crate::batch::{IndexBatch, IndexingResult};
use crate::errors::SearchError;
use crate::types::{IndexDefinition, ServiceResponse};
use search_client_shared::{IndexStatistics, SearchParameters};

/// Abstracts the remote document-search service.
///
/// Implementations are built once per connection by the client lifecycle
/// and shared by every operation on that connection.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync` to allow use across async tasks.
///
/// # Error Handling
///
/// Transport and service faults are reported as `SearchError::ServiceFault`
/// so they stay distinguishable from legitimate empty results.
#[async_trait]
pub trait SearchService: Send + Sync {
    /// Check whether an index exists.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - If the index exists
    /// * `Ok(false)` - If it does not
    /// * `Err(SearchError)` - If the check could not be performed
    async fn index_exists(&self, index: &str) -> Result<bool, SearchError>;

    /// Create an index from a definition.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(definition))` - The definition the service accepted
    /// * `Ok(None)` - If the service accepted the call but returned no definition
    /// * `Err(SearchError)` - If creation failed
    async fn create_index(
        &self,
        definition: &IndexDefinition,
    ) -> Result<Option<IndexDefinition>, SearchError>;

    /// Delete an index. Deleting an absent index completes without error.
    async fn delete_index(&self, index: &str) -> Result<(), SearchError>;

    /// Read document count and storage usage of an index.
    async fn index_statistics(&self, index: &str) -> Result<IndexStatistics, SearchError>;

    /// Submit a batch of document actions as a single request.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(results))` - Per-document results
    /// * `Ok(None)` - If the service returned no per-document results
    /// * `Err(SearchError)` - If the request itself failed
    async fn submit_batch(
        &self,
        index: &str,
        batch: &IndexBatch,
    ) -> Result<Option<Vec<IndexingResult>>, SearchError>;

    /// Run a search request.
    ///
    /// A non-success HTTP status is returned as a `ServiceResponse`, not an
    /// error; `Err` is reserved for faults where no response was obtained.
    async fn search(
        &self,
        index: &str,
        parameters: &SearchParameters,
        search_text: Option<&str>,
    ) -> Result<ServiceResponse, SearchError>;

    /// Release any resources held by the service handle.
    ///
    /// Called at most once, when the owning connection is disposed.
    fn release(&self) {}
}
