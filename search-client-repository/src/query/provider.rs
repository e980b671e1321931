//! Query execution contract and the connection-backed provider.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::connection::ConnectionContext;
use crate::errors::SearchError;
use crate::query::Expression;

/// Executes query expressions.
///
/// Implementations must observe the cancellation token around their remote
/// calls: once it fires, the call is abandoned and `SearchError::Cancelled`
/// is returned, never an empty result.
#[async_trait]
pub trait QueryProvider: Send + Sync {
    /// Execute an expression.
    ///
    /// # Returns
    ///
    /// * `Ok(Value)` - A JSON array holding one element per result
    /// * `Err(SearchError)` - If execution failed or was cancelled
    async fn execute(
        &self,
        expression: &Expression,
        cancellation: Option<CancellationToken>,
    ) -> Result<Value, SearchError>;
}

impl dyn QueryProvider {
    /// Execute an expression and decode each result as `R`.
    pub async fn execute_as<R: DeserializeOwned>(
        &self,
        expression: &Expression,
        cancellation: Option<CancellationToken>,
    ) -> Result<Vec<R>, SearchError> {
        let value = self.execute(expression, cancellation).await?;
        Ok(serde_json::from_value(value)?)
    }
}

/// Provider that runs expressions as searches through a connection.
pub struct SearchQueryProvider {
    context: ConnectionContext,
}

impl SearchQueryProvider {
    pub(crate) fn new(context: ConnectionContext) -> Self {
        Self { context }
    }
}

#[async_trait]
impl QueryProvider for SearchQueryProvider {
    async fn execute(
        &self,
        expression: &Expression,
        cancellation: Option<CancellationToken>,
    ) -> Result<Value, SearchError> {
        let (parameters, search_text) = expression.to_parameters()?;
        let request =
            self.context
                .search_response(expression.entity(), &parameters, search_text.as_deref());

        let response = match cancellation {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        debug!(entity = %expression.entity(), "Query cancelled");
                        return Err(SearchError::Cancelled);
                    }
                    response = request => response?,
                }
            }
            None => request.await?,
        };

        if !response.is_success() {
            return Err(SearchError::service(response.status, response.failure_reason()));
        }

        let sources = response.body["hits"]["hits"]
            .as_array()
            .map(|hits| hits.iter().map(|hit| hit["_source"].clone()).collect())
            .unwrap_or_default();

        Ok(Value::Array(sources))
    }
}
