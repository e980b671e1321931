//! Search parameters and typed search results.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::schema::ScoringProfile;

/// A sort key applied to search results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortField {
    /// Field to sort by.
    pub field: String,
    /// Sort in descending order.
    pub descending: bool,
}

impl SortField {
    /// Ascending sort on `field`.
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: false,
        }
    }

    /// Descending sort on `field`.
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: true,
        }
    }
}

/// Parameters of a search request, independent of the search text.
///
/// Filters are query-DSL clauses that must all match. Sort keys apply in
/// the order they were added.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchParameters {
    /// Query clauses that every hit must satisfy.
    pub filters: Vec<Value>,
    /// Sort keys, most significant first.
    pub order_by: Vec<SortField>,
    /// Number of hits to skip.
    pub skip: Option<usize>,
    /// Maximum number of hits to return.
    pub top: Option<usize>,
    /// Fields to return; empty returns the whole document.
    pub select: Vec<String>,
    /// Fields the search text is matched against; empty searches all fields.
    pub search_fields: Vec<String>,
    /// Request an exact total hit count.
    pub include_total_count: bool,
    /// Field weights applied to the search text.
    pub scoring_profile: Option<ScoringProfile>,
}

impl SearchParameters {
    /// Create empty parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a filter clause.
    pub fn with_filter(mut self, clause: Value) -> Self {
        self.filters.push(clause);
        self
    }

    /// Add a sort key.
    pub fn with_order_by(mut self, sort: SortField) -> Self {
        self.order_by.push(sort);
        self
    }

    /// Skip the first `skip` hits.
    pub fn with_skip(mut self, skip: usize) -> Self {
        self.skip = Some(skip);
        self
    }

    /// Return at most `top` hits.
    pub fn with_top(mut self, top: usize) -> Self {
        self.top = Some(top);
        self
    }

    /// Restrict the returned fields.
    pub fn with_select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Restrict the fields matched by the search text.
    pub fn with_search_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.search_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Request an exact total count.
    pub fn with_total_count(mut self) -> Self {
        self.include_total_count = true;
        self
    }

    /// Rank text matches with a scoring profile's field weights.
    pub fn with_scoring_profile(mut self, profile: ScoringProfile) -> Self {
        self.scoring_profile = Some(profile);
        self
    }
}

/// A single search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit<T> {
    /// Relevance score, absent when results are sorted by field.
    pub score: Option<f64>,
    /// The matched document.
    pub document: T,
}

/// Typed results of a search request.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResults<T> {
    /// Total number of matching documents, when reported.
    pub total: Option<u64>,
    /// Hits in ranking order.
    pub hits: Vec<SearchHit<T>>,
}

impl<T> SearchResults<T> {
    /// Results with no hits.
    pub fn empty() -> Self {
        Self {
            total: Some(0),
            hits: Vec::new(),
        }
    }

    /// Drop scores and keep the documents in ranking order.
    pub fn into_documents(self) -> Vec<T> {
        self.hits.into_iter().map(|hit| hit.document).collect()
    }

    /// Number of hits returned.
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    /// Whether no hits were returned.
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}
