//! Deferred, composable queries.
//!
//! A `Query<T>` holds an expression and the provider that will execute it.
//! Nothing runs until the query is enumerated with `to_vec` or `first`.
//! Combinators return a new query and leave the original untouched.
//!
//! # Example
//!
//! ```ignore
//! let top_rated: Vec<Hotel> = connection
//!     .query::<Hotel>()
//!     .search("pool")
//!     .filter(json!({ "term": { "city": "Porto" } }))
//!     .order_by_desc("rating")
//!     .take(10)
//!     .to_vec()
//!     .await?;
//! ```

mod expression;
mod provider;

pub use expression::{Expression, QueryOperator};
pub use provider::{QueryProvider, SearchQueryProvider};

use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::errors::SearchError;
use search_client_shared::Document;

/// A deferred query yielding elements of type `T`.
pub struct Query<T> {
    provider: Arc<dyn QueryProvider>,
    expression: Expression,
    _element: PhantomData<fn() -> T>,
}

impl<T: Document> Query<T> {
    /// The root query over all documents of type `T`.
    pub fn root(provider: Arc<dyn QueryProvider>) -> Self {
        Self {
            provider,
            expression: Expression::source::<T>(),
            _element: PhantomData,
        }
    }
}

impl<T: DeserializeOwned> Query<T> {
    /// Wrap an existing expression.
    ///
    /// Fails with `InvalidArgument` when the expression does not yield `T`.
    pub fn from_expression(
        provider: Arc<dyn QueryProvider>,
        expression: Expression,
    ) -> Result<Self, SearchError> {
        if !expression.yields::<T>() {
            return Err(SearchError::invalid_argument(format!(
                "expression yields {}, not {}",
                expression.element_type(),
                type_name::<T>()
            )));
        }

        Ok(Self {
            provider,
            expression,
            _element: PhantomData,
        })
    }

    /// The expression this query executes.
    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    /// The provider this query executes against.
    pub fn provider(&self) -> &Arc<dyn QueryProvider> {
        &self.provider
    }

    fn apply(&self, operator: QueryOperator) -> Self {
        Self {
            provider: self.provider.clone(),
            expression: self.expression.apply(operator),
            _element: PhantomData,
        }
    }

    /// Match documents against a search text.
    pub fn search(&self, text: impl Into<String>) -> Self {
        self.apply(QueryOperator::Search(text.into()))
    }

    /// Keep documents matching a query-DSL clause.
    pub fn filter(&self, clause: Value) -> Self {
        self.apply(QueryOperator::Filter(clause))
    }

    /// Sort ascending by `field`, after any earlier sort keys.
    pub fn order_by(&self, field: impl Into<String>) -> Self {
        self.apply(QueryOperator::OrderBy {
            field: field.into(),
            descending: false,
        })
    }

    /// Sort descending by `field`, after any earlier sort keys.
    pub fn order_by_desc(&self, field: impl Into<String>) -> Self {
        self.apply(QueryOperator::OrderBy {
            field: field.into(),
            descending: true,
        })
    }

    pub fn skip(&self, count: usize) -> Self {
        self.apply(QueryOperator::Skip(count))
    }

    pub fn take(&self, count: usize) -> Self {
        self.apply(QueryOperator::Take(count))
    }

    /// Project each result onto `fields`, decoded as `U`.
    pub fn select<U: DeserializeOwned>(&self, fields: &[&str]) -> Query<U> {
        Query {
            provider: self.provider.clone(),
            expression: self.expression.apply(QueryOperator::Select {
                fields: fields.iter().map(|f| f.to_string()).collect(),
                element_type: type_name::<U>(),
            }),
            _element: PhantomData,
        }
    }

    /// Execute the query and collect the results.
    pub async fn to_vec(&self) -> Result<Vec<T>, SearchError> {
        self.provider.execute_as(&self.expression, None).await
    }

    /// Execute the query, abandoning it when `token` is cancelled.
    pub async fn to_vec_with_cancellation(
        &self,
        token: CancellationToken,
    ) -> Result<Vec<T>, SearchError> {
        self.provider.execute_as(&self.expression, Some(token)).await
    }

    /// Execute the query for its first result only.
    pub async fn first(&self) -> Result<Option<T>, SearchError> {
        Ok(self.take(1).to_vec().await?.into_iter().next())
    }
}

impl<T> Clone for Query<T> {
    fn clone(&self) -> Self {
        Self {
            provider: self.provider.clone(),
            expression: self.expression.clone(),
            _element: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Query<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("expression", &self.expression)
            .finish()
    }
}
