//! Mutation requests and batch outcomes.
//!
//! A [`MutationSet`] is the ordered, key-unique request a caller hands to
//! the batch engine. It is lowered into an [`IndexBatch`] of per-document
//! [`IndexAction`]s, submitted in one request, and the per-document
//! [`IndexingResult`]s are folded into a [`BatchReport`].

use std::collections::{HashMap, HashSet};

use serde_json::Value;

use crate::errors::SearchError;
use search_client_shared::Document;

/// What to do with one document in a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MutationKind {
    /// Insert the document, replacing any existing one with the same key.
    Upload,
    /// Remove the document with this key.
    Delete,
    /// Update the given fields of an existing document.
    Merge,
    /// Update the document if it exists, insert it otherwise.
    #[default]
    MergeOrUpload,
}

impl From<&str> for MutationKind {
    /// Parse a kind by name. Unrecognized names fall back to `MergeOrUpload`.
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "upload" => Self::Upload,
            "delete" => Self::Delete,
            "merge" => Self::Merge,
            _ => Self::MergeOrUpload,
        }
    }
}

/// Ordered mapping from entity to mutation kind, unique by document key.
///
/// Iteration order is insertion order and defines submission order within
/// the batch. Inserting an entity whose key is already present replaces the
/// earlier entry in place.
#[derive(Debug, Clone)]
pub struct MutationSet<T> {
    entries: Vec<(T, MutationKind)>,
    positions: HashMap<String, usize>,
}

impl<T: Document> MutationSet<T> {
    /// Create an empty set.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            positions: HashMap::new(),
        }
    }

    /// Add an entity with the given kind.
    pub fn insert(&mut self, entity: T, kind: MutationKind) -> &mut Self {
        let key = entity.key();
        match self.positions.get(&key) {
            Some(&position) => self.entries[position] = (entity, kind),
            None => {
                self.positions.insert(key, self.entries.len());
                self.entries.push((entity, kind));
            }
        }
        self
    }

    /// Add an entity to upload.
    pub fn upload(mut self, entity: T) -> Self {
        self.insert(entity, MutationKind::Upload);
        self
    }

    /// Add an entity to delete.
    pub fn delete(mut self, entity: T) -> Self {
        self.insert(entity, MutationKind::Delete);
        self
    }

    /// Add an entity to merge.
    pub fn merge(mut self, entity: T) -> Self {
        self.insert(entity, MutationKind::Merge);
        self
    }

    /// Add an entity to merge or upload.
    pub fn merge_or_upload(mut self, entity: T) -> Self {
        self.insert(entity, MutationKind::MergeOrUpload);
        self
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in submission order.
    pub fn iter(&self) -> impl Iterator<Item = &(T, MutationKind)> {
        self.entries.iter()
    }

    /// Lower the set into a batch of per-document actions, preserving order.
    pub fn to_batch(&self) -> Result<IndexBatch, SearchError> {
        let actions = self
            .entries
            .iter()
            .map(|(entity, kind)| IndexAction::new(*kind, entity))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(IndexBatch { actions })
    }
}

impl<T: Document> Default for MutationSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Document> FromIterator<(T, MutationKind)> for MutationSet<T> {
    fn from_iter<I: IntoIterator<Item = (T, MutationKind)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (entity, kind) in iter {
            set.insert(entity, kind);
        }
        set
    }
}

/// One document action inside a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexAction {
    /// Action to perform.
    pub kind: MutationKind,
    /// Document key.
    pub key: String,
    /// Serialized document.
    pub document: Value,
}

impl IndexAction {
    /// Build the action for an entity.
    pub fn new<T: Document>(kind: MutationKind, entity: &T) -> Result<Self, SearchError> {
        Ok(Self {
            kind,
            key: entity.key(),
            document: serde_json::to_value(entity)?,
        })
    }
}

/// Ordered set of actions submitted as a single request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexBatch {
    /// Actions in submission order.
    pub actions: Vec<IndexAction>,
}

impl IndexBatch {
    /// Number of actions in the batch.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Whether the batch has no actions.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Document keys in submission order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.actions.iter().map(|action| action.key.as_str())
    }
}

/// Service acknowledgement for one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexingResult {
    /// Document key.
    pub key: String,
    /// Whether the document was applied.
    pub succeeded: bool,
    /// Per-document HTTP status.
    pub status: u16,
    /// Failure reason reported by the service.
    pub error_message: Option<String>,
}

impl IndexingResult {
    /// A successful acknowledgement.
    pub fn acknowledged(key: impl Into<String>, status: u16) -> Self {
        Self {
            key: key.into(),
            succeeded: true,
            status,
            error_message: None,
        }
    }

    /// A failed acknowledgement.
    pub fn failed(key: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            succeeded: false,
            status,
            error_message: Some(message.into()),
        }
    }
}

/// Outcome of a fully acknowledged batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    /// Number of documents submitted.
    pub submitted: usize,
    /// Number of documents acknowledged.
    pub acknowledged: usize,
    /// Per-document results in service order.
    pub results: Vec<IndexingResult>,
}

impl BatchReport {
    /// Check the service results against the submitted batch.
    ///
    /// Succeeds only when the service returned a result list and every
    /// submitted document has a successful acknowledgement. Otherwise the
    /// error lists the unacknowledged keys in submission order.
    pub fn evaluate(
        batch: &IndexBatch,
        results: Option<Vec<IndexingResult>>,
    ) -> Result<Self, SearchError> {
        let submitted = batch.len();
        let results = results.unwrap_or_default();

        let acknowledged: HashSet<&str> = results
            .iter()
            .filter(|result| result.succeeded)
            .map(|result| result.key.as_str())
            .collect();

        let failed_keys: Vec<String> = batch
            .keys()
            .filter(|key| !acknowledged.contains(key))
            .map(str::to_string)
            .collect();

        let acknowledged_count = submitted - failed_keys.len();
        if !failed_keys.is_empty() {
            return Err(SearchError::PartialBatchFailure {
                submitted,
                acknowledged: acknowledged_count,
                failed_keys,
            });
        }

        Ok(Self {
            submitted,
            acknowledged: acknowledged_count,
            results,
        })
    }
}

/// Result of an operation whose runtime faults are reported, not raised.
///
/// Index administration and batch mutation never return `Err` for faults
/// raised by the service; they return `Outcome::Failed` carrying the reason
/// after the fault has been logged.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T = ()> {
    /// The operation completed.
    Succeeded(T),
    /// The operation failed with the given reason.
    Failed(SearchError),
}

impl<T> Outcome<T> {
    /// Whether the operation completed.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }

    /// The value, if the operation completed.
    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Succeeded(value) => Some(value),
            Self::Failed(_) => None,
        }
    }

    /// The failure reason, if the operation failed.
    pub fn failure(&self) -> Option<&SearchError> {
        match self {
            Self::Succeeded(_) => None,
            Self::Failed(err) => Some(err),
        }
    }

    /// Convert into a `Result`.
    pub fn into_result(self) -> Result<T, SearchError> {
        match self {
            Self::Succeeded(value) => Ok(value),
            Self::Failed(err) => Err(err),
        }
    }
}

impl<T> From<Result<T, SearchError>> for Outcome<T> {
    fn from(result: Result<T, SearchError>) -> Self {
        match result {
            Ok(value) => Self::Succeeded(value),
            Err(err) => Self::Failed(err),
        }
    }
}
