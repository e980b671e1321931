//! Configuration types for the SearchConnection.

use std::time::Duration;

use url::Url;

use crate::errors::SearchError;
use crate::retry::RetryPolicy;
use search_client_shared::EntityType;

/// Default timeout applied to every request.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Which index (or indexes) a connection targets.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexTarget {
    /// A placeholder index, bound to the first entity type resolved.
    Single(String),
    /// One index bound to one entity type up front.
    SingleForType(EntityType, String),
    /// Explicit entity type to index bindings.
    Map(Vec<(EntityType, String)>),
}

/// Configuration for a SearchConnection.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Service name, or the full service URL.
    pub service_name: String,
    /// Key sent with every request.
    pub service_key: String,
    /// Index bindings.
    pub target: IndexTarget,
    /// Retry policy for transient faults. `None` disables retries.
    pub retry: Option<RetryPolicy>,
    /// Timeout applied to every request.
    pub request_timeout: Duration,
}

impl ConnectionConfig {
    /// Create a config, rejecting a blank service name or key.
    pub fn new(
        service_name: impl Into<String>,
        service_key: impl Into<String>,
        target: IndexTarget,
    ) -> Result<Self, SearchError> {
        let config = Self {
            service_name: service_name.into(),
            service_key: service_key.into(),
            target,
            retry: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check that the service name and key are not blank.
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.service_name.trim().is_empty() {
            return Err(SearchError::invalid_argument("service name is required"));
        }
        if self.service_key.trim().is_empty() {
            return Err(SearchError::invalid_argument("service key is required"));
        }
        Ok(())
    }

    /// Enable retries with the given policy.
    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    /// Set the request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// The service URL.
    ///
    /// A service name that already is an `http(s)` URL is used as is; a bare
    /// name resolves to `https://{name}`.
    pub fn endpoint(&self) -> Result<Url, SearchError> {
        let name = self.service_name.trim();
        let raw = if name.starts_with("http://") || name.starts_with("https://") {
            name.to_string()
        } else {
            format!("https://{}", name)
        };

        Url::parse(&raw)
            .map_err(|e| SearchError::invalid_argument(format!("Invalid service name {}: {}", name, e)))
    }
}
