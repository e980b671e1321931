//! Typed connection to a remote search service.
//!
//! `SearchConnection` ties the index registry, the client lifecycle and the
//! diagnostic sink together and exposes the operations callers use:
//!
//! - index administration (`ensure_index`, `delete_index`, `statistics`),
//!   which report runtime faults as `Outcome::Failed`
//! - batch mutation (`mutate`), which fails when any document goes
//!   unacknowledged and logs each such key
//! - search, direct (`search`) or deferred (`query`), where a transport
//!   fault is logged and then returned as `Err`

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::batch::{BatchReport, MutationSet, Outcome};
use crate::config::{ConnectionConfig, IndexTarget};
use crate::errors::SearchError;
use crate::interfaces::{DiagnosticEvent, DiagnosticSink, NoopSink, SearchService, Severity};
use crate::lifecycle::{opensearch_factory, ClientLifecycle, ServiceFactory};
use crate::query::{Query, QueryProvider, SearchQueryProvider};
use crate::registry::IndexRegistry;
use crate::types::{IndexDefinition, ServiceResponse};
use search_client_shared::{
    Document, EntityType, IndexStatistics, ScoringConfig, SearchParameters, SearchResults,
};

/// State shared between a connection and the queries it creates.
#[derive(Clone)]
pub(crate) struct ConnectionContext {
    registry: Arc<IndexRegistry>,
    lifecycle: Arc<ClientLifecycle>,
    sink: Arc<dyn DiagnosticSink>,
}

impl ConnectionContext {
    fn service_name(&self) -> &str {
        &self.lifecycle.config().service_name
    }

    fn log(&self, event: DiagnosticEvent) {
        self.sink.log(event.with("service", self.service_name()));
    }

    async fn client(&self) -> Result<Arc<dyn SearchService>, SearchError> {
        self.lifecycle.client().await
    }

    /// Report a failed operation and turn it into an `Outcome`.
    fn fail<T>(&self, operation: &str, entity: EntityType, fault: SearchError) -> Outcome<T> {
        let mut event = DiagnosticEvent::new(Severity::Error, format!("{} failed", operation))
            .with("entity", entity);
        if let Some(index) = self.registry.binding(entity) {
            event = event.with("index", index);
        }
        self.log(event.with_fault(fault.clone()));
        Outcome::Failed(fault)
    }

    /// Run a search and log its outcome.
    ///
    /// A response is returned whatever its HTTP status; `Err` means no
    /// response was obtained.
    pub(crate) async fn search_response(
        &self,
        entity: EntityType,
        parameters: &SearchParameters,
        search_text: Option<&str>,
    ) -> Result<ServiceResponse, SearchError> {
        let query_text = search_text.unwrap_or("*");

        let result = match self.registry.resolve(entity) {
            Ok(index) => self
                .run_search(&index, parameters, search_text)
                .await
                .map(|response| (index, response)),
            Err(fault) => Err(fault),
        };

        match result {
            Ok((index, response)) if response.is_success() => {
                if let Some(search_id) = &response.search_id {
                    self.log(
                        DiagnosticEvent::new(Severity::Information, "Search completed")
                            .with("search_id", search_id)
                            .with("index", &index)
                            .with("query", query_text),
                    );
                }
                debug!(index = %index, status = response.status, "Search completed");
                Ok(response)
            }
            Ok((index, response)) => {
                self.log(
                    DiagnosticEvent::new(
                        Severity::Warning,
                        format!("Search failed: {}", response.failure_reason()),
                    )
                    .with("status", response.status)
                    .with("index", &index)
                    .with("query", query_text),
                );
                Ok(response)
            }
            Err(fault) => {
                let mut event = DiagnosticEvent::new(Severity::Error, "Search request faulted")
                    .with("entity", entity)
                    .with("query", query_text)
                    .with(
                        "parameters",
                        serde_json::to_string(parameters).unwrap_or_default(),
                    );
                if let Some(index) = self.registry.binding(entity) {
                    event = event.with("index", index);
                }
                self.log(event.with_fault(fault.clone()));
                Err(fault)
            }
        }
    }

    async fn run_search(
        &self,
        index: &str,
        parameters: &SearchParameters,
        search_text: Option<&str>,
    ) -> Result<ServiceResponse, SearchError> {
        let client = self.client().await?;
        client.search(index, parameters, search_text).await
    }
}

/// Typed connection to a remote search service.
///
/// # Example
///
/// ```ignore
/// let connection = SearchConnection::single("search-prod", api_key, "hotels")?
///     .with_sink(Arc::new(TracingSink));
///
/// connection.ensure_index::<Hotel>(None).await;
///
/// let mutations = MutationSet::new().upload(hotel).delete(closed_hotel);
/// if let Outcome::Failed(fault) = connection.mutate(mutations).await? {
///     // unacknowledged keys were already logged
/// }
/// ```
pub struct SearchConnection {
    context: ConnectionContext,
}

impl SearchConnection {
    /// Create a connection backed by OpenSearch.
    pub fn new(config: ConnectionConfig) -> Result<Self, SearchError> {
        Self::with_service(config, opensearch_factory())
    }

    /// Create a connection whose service handle is built by `factory`.
    ///
    /// The factory runs on first use, not here. Argument and binding
    /// problems are reported now.
    pub fn with_service(config: ConnectionConfig, factory: ServiceFactory) -> Result<Self, SearchError> {
        config.validate()?;
        let registry = IndexRegistry::from_target(&config.target)?;
        let lifecycle = ClientLifecycle::new(config, factory)?;

        Ok(Self {
            context: ConnectionContext {
                registry: Arc::new(registry),
                lifecycle: Arc::new(lifecycle),
                sink: Arc::new(NoopSink),
            },
        })
    }

    /// Connection whose `index` binds to the first entity type used.
    pub fn single(
        service_name: impl Into<String>,
        service_key: impl Into<String>,
        index: impl Into<String>,
    ) -> Result<Self, SearchError> {
        let config = ConnectionConfig::new(service_name, service_key, IndexTarget::Single(index.into()))?;
        Self::new(config)
    }

    /// Connection with `index` bound to `T` up front.
    pub fn single_for<T: Document>(
        service_name: impl Into<String>,
        service_key: impl Into<String>,
        index: impl Into<String>,
    ) -> Result<Self, SearchError> {
        let target = IndexTarget::SingleForType(EntityType::of::<T>(), index.into());
        Self::new(ConnectionConfig::new(service_name, service_key, target)?)
    }

    /// Connection with explicit entity type to index bindings.
    pub fn with_bindings(
        service_name: impl Into<String>,
        service_key: impl Into<String>,
        bindings: Vec<(EntityType, String)>,
    ) -> Result<Self, SearchError> {
        Self::new(ConnectionConfig::new(service_name, service_key, IndexTarget::Map(bindings))?)
    }

    /// Report diagnostics to `sink` instead of discarding them.
    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.context.sink = sink;
        self
    }

    pub fn config(&self) -> &ConnectionConfig {
        self.context.lifecycle.config()
    }

    /// The index `T` resolves to, binding it if this is the first use.
    pub fn index_for<T: Document>(&self) -> Result<String, SearchError> {
        self.context.registry.resolve_for::<T>()
    }

    /// Make sure the index for `T` exists, creating it if absent.
    ///
    /// An existing index is left as is, whatever its schema.
    pub async fn ensure_index<T: Document>(&self, scoring: Option<ScoringConfig>) -> Outcome {
        let entity = EntityType::of::<T>();
        match self.try_ensure_index::<T>(scoring).await {
            Ok(()) => Outcome::Succeeded(()),
            Err(fault) => self.context.fail("Ensure index", entity, fault),
        }
    }

    async fn try_ensure_index<T: Document>(&self, scoring: Option<ScoringConfig>) -> Result<(), SearchError> {
        let index = self.context.registry.resolve_for::<T>()?;
        let client = self.context.client().await?;

        if client.index_exists(&index).await? {
            debug!(index = %index, "Index already exists");
            return Ok(());
        }

        let definition = IndexDefinition::for_document::<T>(index.as_str(), scoring);
        match client.create_index(&definition).await? {
            Some(created) => {
                info!(index = %created.name, fields = created.fields.len(), "Created index");
                Ok(())
            }
            None => Err(SearchError::ServiceFault {
                status: None,
                message: format!("Creating index {} returned no definition", index),
            }),
        }
    }

    /// Delete the index for `T`. Deleting an absent index succeeds.
    pub async fn delete_index<T: Document>(&self) -> Outcome {
        let entity = EntityType::of::<T>();
        let result: Result<(), SearchError> = async {
            let index = self.context.registry.resolve(entity)?;
            self.context.client().await?.delete_index(&index).await?;
            debug!(index = %index, "Deleted index");
            Ok(())
        }
        .await;

        match result {
            Ok(()) => Outcome::Succeeded(()),
            Err(fault) => self.context.fail("Delete index", entity, fault),
        }
    }

    /// Document count and storage size of the index for `T`.
    pub async fn statistics<T: Document>(&self) -> Outcome<IndexStatistics> {
        let entity = EntityType::of::<T>();
        let result: Result<IndexStatistics, SearchError> = async {
            let index = self.context.registry.resolve(entity)?;
            self.context.client().await?.index_statistics(&index).await
        }
        .await;

        match result {
            Ok(statistics) => Outcome::Succeeded(statistics),
            Err(fault) => self.context.fail("Index statistics", entity, fault),
        }
    }

    /// Submit every mutation in `mutations` as one batch, in order.
    ///
    /// Fails with `InvalidArgument`, before any remote call, when the set is
    /// empty. Otherwise the outcome succeeds only when every submitted
    /// document is acknowledged; each unacknowledged key is logged on its own.
    pub async fn mutate<T: Document>(
        &self,
        mutations: MutationSet<T>,
    ) -> Result<Outcome<BatchReport>, SearchError> {
        if mutations.is_empty() {
            return Err(SearchError::invalid_argument("mutation set is empty"));
        }

        let entity = EntityType::of::<T>();
        let result = self.submit(&mutations).await;

        let fault = match result {
            Ok(report) => return Ok(Outcome::Succeeded(report)),
            Err(fault) => fault,
        };

        if let SearchError::PartialBatchFailure { .. } = fault {
            return Ok(Outcome::Failed(fault));
        }
        Ok(self.context.fail("Batch mutation", entity, fault))
    }

    async fn submit<T: Document>(&self, mutations: &MutationSet<T>) -> Result<BatchReport, SearchError> {
        let index = self.context.registry.resolve_for::<T>()?;
        let batch = mutations.to_batch()?;
        let client = self.context.client().await?;

        debug!(index = %index, count = batch.len(), "Submitting batch");
        let results = client.submit_batch(&index, &batch).await?;

        let reasons: HashMap<String, String> = results
            .iter()
            .flatten()
            .filter(|result| !result.succeeded)
            .map(|result| {
                let reason = result
                    .error_message
                    .clone()
                    .unwrap_or_else(|| format!("status {}", result.status));
                (result.key.clone(), reason)
            })
            .collect();

        let report = BatchReport::evaluate(&batch, results);
        if let Err(SearchError::PartialBatchFailure { submitted, acknowledged, failed_keys }) = &report {
            for key in failed_keys {
                let reason = reasons
                    .get(key)
                    .map(String::as_str)
                    .unwrap_or("not acknowledged");
                self.context.log(
                    DiagnosticEvent::new(Severity::Error, format!("Indexing failed for key {}", key))
                        .with("index", &index)
                        .with("key", key)
                        .with("reason", reason),
                );
            }
            info!(
                index = %index,
                submitted = submitted,
                acknowledged = acknowledged,
                "Batch partially indexed"
            );
        }

        report
    }

    /// Search the index for `T`.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(results))` - The decoded hits of a successful response
    /// * `Ok(None)` - If the service answered with a failure status (logged as a warning)
    /// * `Err(SearchError)` - If no response was obtained (logged, then returned)
    pub async fn search<T: Document>(
        &self,
        parameters: &SearchParameters,
        search_text: Option<&str>,
    ) -> Result<Option<SearchResults<T>>, SearchError> {
        let response = self
            .context
            .search_response(EntityType::of::<T>(), parameters, search_text)
            .await?;

        if !response.is_success() {
            return Ok(None);
        }
        response.into_results().map(Some)
    }

    /// A deferred query over all documents of type `T`.
    pub fn query<T: Document>(&self) -> Query<T> {
        let provider: Arc<dyn QueryProvider> =
            Arc::new(SearchQueryProvider::new(self.context.clone()));
        Query::root(provider)
    }

    /// Release the service handle. Safe to call more than once, and before
    /// the handle was ever built.
    pub fn dispose(&self) {
        self.context.lifecycle.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.context.lifecycle.is_disposed()
    }
}
