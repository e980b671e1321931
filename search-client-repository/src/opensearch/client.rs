//! OpenSearch service implementation.
//!
//! This module provides the concrete implementation of `SearchService`
//! using the OpenSearch Rust client.

use async_trait::async_trait;
use opensearch::{
    http::{
        headers::{HeaderName, HeaderValue},
        request::JsonBody,
        response::Response,
        transport::{SingleNodeConnectionPool, TransportBuilder},
    },
    indices::{IndicesCreateParts, IndicesDeleteParts, IndicesExistsParts, IndicesStatsParts},
    BulkParts, OpenSearch, SearchParts,
};
use serde_json::Value;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use crate::batch::{IndexBatch, IndexingResult};
use crate::config::ConnectionConfig;
use crate::errors::SearchError;
use crate::interfaces::SearchService;
use crate::opensearch::bulk::{parse_bulk_items, to_bulk_lines};
use crate::opensearch::index_config::get_index_body;
use crate::opensearch::queries::build_search_body;
use crate::types::{IndexDefinition, ServiceResponse};
use search_client_shared::{IndexStatistics, SearchParameters};

const API_KEY_HEADER: &str = "api-key";
const OPAQUE_ID_HEADER: &str = "x-opaque-id";
const REQUEST_ID_HEADER: &str = "x-request-id";

/// OpenSearch service implementation.
///
/// # Example
///
/// ```ignore
/// let config = ConnectionConfig::new(
///     "http://localhost:9200",
///     "secret",
///     IndexTarget::Single("hotels".to_string()),
/// )?;
/// let service = OpenSearchService::new(&config)?;
/// let exists = service.index_exists("hotels").await?;
/// ```
pub struct OpenSearchService {
    client: OpenSearch,
    service_name: String,
}

impl OpenSearchService {
    /// Create a new OpenSearch service for the configured endpoint.
    ///
    /// Every request carries the service key in the `api-key` header and is
    /// bounded by the configured request timeout.
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchService)` - A new service instance
    /// * `Err(SearchError)` - If the endpoint or key is invalid, or transport setup fails
    pub fn new(config: &ConnectionConfig) -> Result<Self, SearchError> {
        let url = config.endpoint()?;
        let api_key = HeaderValue::from_str(config.service_key.trim())
            .map_err(|e| SearchError::invalid_argument(format!("Invalid service key: {}", e)))?;

        let conn_pool = SingleNodeConnectionPool::new(url.clone());
        let transport = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .timeout(config.request_timeout)
            .header(HeaderName::from_static(API_KEY_HEADER), api_key)
            .build()
            .map_err(|e| SearchError::transport(e.to_string()))?;

        info!(
            url = %url,
            timeout_ms = config.request_timeout.as_millis() as u64,
            "Created OpenSearch service client"
        );

        Ok(Self {
            client: OpenSearch::new(transport),
            service_name: config.service_name.clone(),
        })
    }

    /// Turn a non-success response into a `ServiceFault` carrying its status.
    async fn fault(response: Response, action: &str) -> SearchError {
        let status = response.status_code().as_u16();
        let body = response.text().await.unwrap_or_default();
        error!(status = status, body = %body, "{} request failed", action);
        SearchError::service(status, format!("{} failed: {}", action, body))
    }

    fn response_header(response: &Response, name: &str) -> Option<String> {
        response
            .headers()
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    }
}

#[async_trait]
impl SearchService for OpenSearchService {
    #[instrument(skip(self), fields(service = %self.service_name))]
    async fn index_exists(&self, index: &str) -> Result<bool, SearchError> {
        let response = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[index]))
            .send()
            .await?;

        match response.status_code().as_u16() {
            200..=299 => Ok(true),
            404 => Ok(false),
            _ => Err(Self::fault(response, "Index existence check").await),
        }
    }

    #[instrument(skip(self, definition), fields(service = %self.service_name, index = %definition.name))]
    async fn create_index(
        &self,
        definition: &IndexDefinition,
    ) -> Result<Option<IndexDefinition>, SearchError> {
        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(&definition.name))
            .body(get_index_body(definition))
            .send()
            .await?;

        let status = response.status_code();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // Lost a creation race; the index is there
            if body.contains("resource_already_exists_exception") {
                debug!("Index already exists");
                return Ok(Some(definition.clone()));
            }
            error!(status = %status, body = %body, "Create index request failed");
            return Err(SearchError::service(
                status.as_u16(),
                format!("Create index failed: {}", body),
            ));
        }

        let body: Value = response.json().await?;
        if body["acknowledged"].as_bool() == Some(false) {
            return Ok(None);
        }

        debug!("Created index");
        Ok(Some(definition.clone()))
    }

    #[instrument(skip(self), fields(service = %self.service_name))]
    async fn delete_index(&self, index: &str) -> Result<(), SearchError> {
        let response = self
            .client
            .indices()
            .delete(IndicesDeleteParts::Index(&[index]))
            .send()
            .await?;

        let status = response.status_code();
        // 404 is OK (index doesn't exist)
        if !status.is_success() && status.as_u16() != 404 {
            return Err(Self::fault(response, "Delete index").await);
        }

        debug!("Deleted index");
        Ok(())
    }

    #[instrument(skip(self), fields(service = %self.service_name))]
    async fn index_statistics(&self, index: &str) -> Result<IndexStatistics, SearchError> {
        let response = self
            .client
            .indices()
            .stats(IndicesStatsParts::Index(&[index]))
            .send()
            .await?;

        if !response.status_code().is_success() {
            return Err(Self::fault(response, "Index statistics").await);
        }

        let body: Value = response.json().await?;
        let primaries = &body["_all"]["primaries"];

        Ok(IndexStatistics {
            document_count: primaries["docs"]["count"].as_u64().unwrap_or(0),
            storage_size_bytes: primaries["store"]["size_in_bytes"].as_u64().unwrap_or(0),
        })
    }

    #[instrument(skip(self, batch), fields(service = %self.service_name, actions = batch.len()))]
    async fn submit_batch(
        &self,
        index: &str,
        batch: &IndexBatch,
    ) -> Result<Option<Vec<IndexingResult>>, SearchError> {
        let lines: Vec<JsonBody<Value>> = to_bulk_lines(index, batch)
            .into_iter()
            .map(JsonBody::new)
            .collect();

        let response = self
            .client
            .bulk(BulkParts::Index(index))
            .body(lines)
            .send()
            .await?;

        if !response.status_code().is_success() {
            return Err(Self::fault(response, "Bulk").await);
        }

        let body: Value = response.json().await?;
        let results = parse_bulk_items(&body);

        debug!(
            errors = body["errors"].as_bool().unwrap_or(false),
            items = results.as_ref().map(Vec::len).unwrap_or(0),
            "Bulk request completed"
        );

        Ok(results)
    }

    #[instrument(skip(self, parameters), fields(service = %self.service_name))]
    async fn search(
        &self,
        index: &str,
        parameters: &SearchParameters,
        search_text: Option<&str>,
    ) -> Result<ServiceResponse, SearchError> {
        let request_id = Uuid::new_v4().to_string();
        let opaque_id = HeaderValue::from_str(&request_id)
            .map_err(|e| SearchError::invalid_argument(e.to_string()))?;

        let response = self
            .client
            .search(SearchParts::Index(&[index]))
            .header(HeaderName::from_static(OPAQUE_ID_HEADER), opaque_id)
            .body(build_search_body(parameters, search_text))
            .send()
            .await?;

        let status = response.status_code().as_u16();
        let search_id = Self::response_header(&response, OPAQUE_ID_HEADER)
            .or_else(|| Self::response_header(&response, REQUEST_ID_HEADER))
            .or(Some(request_id));

        let text = response.text().await?;
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));

        Ok(ServiceResponse {
            status,
            search_id,
            body,
        })
    }

    fn release(&self) {
        debug!(service = %self.service_name, "Released OpenSearch service client");
    }
}
