//! Entity type to index name resolution.
//!
//! Each connection owns one `IndexRegistry`. Within it an entity type binds
//! to at most one index and an index is bound by at most one entity type.
//! Bindings are never changed once made.

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;
use tracing::debug;

use crate::config::IndexTarget;
use crate::errors::SearchError;
use search_client_shared::{Document, EntityType};

/// Resolution strategies, tried in this order for an unbound type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResolutionStep {
    /// A binding made at construction or by an earlier resolution.
    Bound,
    /// The placeholder index supplied at construction, consumed once.
    Placeholder,
    /// The index name declared on the document type.
    Declared,
}

const RESOLUTION_ORDER: [ResolutionStep; 3] = [
    ResolutionStep::Bound,
    ResolutionStep::Placeholder,
    ResolutionStep::Declared,
];

#[derive(Debug, Default)]
struct RegistryState {
    bindings: HashMap<EntityType, String>,
    placeholder: Option<String>,
}

impl RegistryState {
    fn is_index_bound(&self, index: &str) -> bool {
        self.bindings.values().any(|bound| bound == index)
    }

    fn try_step(
        &mut self,
        step: ResolutionStep,
        entity: EntityType,
    ) -> Result<Option<String>, SearchError> {
        match step {
            ResolutionStep::Bound => Ok(self.bindings.get(&entity).cloned()),
            ResolutionStep::Placeholder => match self.placeholder.take() {
                Some(index) => {
                    debug!(entity = %entity, index = %index, "Bound entity type to placeholder index");
                    self.bindings.insert(entity, index.clone());
                    Ok(Some(index))
                }
                None => Ok(None),
            },
            ResolutionStep::Declared => {
                let Some(index) = entity.declared_index() else {
                    return Ok(None);
                };
                if self.is_index_bound(index) {
                    return Err(SearchError::invalid_configuration(format!(
                        "Index {} declared by {} is already bound to another entity type",
                        index, entity
                    )));
                }
                debug!(entity = %entity, index = %index, "Bound entity type to declared index");
                self.bindings.insert(entity, index.to_string());
                Ok(Some(index.to_string()))
            }
        }
    }
}

/// Maps entity types to remote index names.
#[derive(Debug, Default)]
pub struct IndexRegistry {
    state: RwLock<RegistryState>,
}

impl IndexRegistry {
    /// Create an empty registry; types resolve through their declared index only.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry from a connection target.
    pub fn from_target(target: &IndexTarget) -> Result<Self, SearchError> {
        match target {
            IndexTarget::Single(index) => Self::with_placeholder(index.clone()),
            IndexTarget::SingleForType(entity, index) => {
                Self::with_bindings(vec![(*entity, index.clone())])
            }
            IndexTarget::Map(bindings) => Self::with_bindings(bindings.clone()),
        }
    }

    /// Create a registry whose placeholder index binds to the first type resolved.
    pub fn with_placeholder(index: impl Into<String>) -> Result<Self, SearchError> {
        let index = index.into();
        if index.trim().is_empty() {
            return Err(SearchError::invalid_argument("index name is required"));
        }

        Ok(Self {
            state: RwLock::new(RegistryState {
                bindings: HashMap::new(),
                placeholder: Some(index),
            }),
        })
    }

    /// Create a registry from explicit bindings.
    ///
    /// Fails with `InvalidArgument` when the list is empty or holds a blank
    /// index name, and with `InvalidConfiguration` when a type or an index
    /// name appears more than once.
    pub fn with_bindings(bindings: Vec<(EntityType, String)>) -> Result<Self, SearchError> {
        if bindings.is_empty() {
            return Err(SearchError::invalid_argument(
                "at least one index binding is required",
            ));
        }

        let mut map = HashMap::with_capacity(bindings.len());
        let mut indexes = HashSet::with_capacity(bindings.len());

        for (entity, index) in bindings {
            if index.trim().is_empty() {
                return Err(SearchError::invalid_argument(format!(
                    "index name for {} is blank",
                    entity
                )));
            }
            if !indexes.insert(index.clone()) {
                return Err(SearchError::invalid_configuration(format!(
                    "index {} is bound to more than one entity type",
                    index
                )));
            }
            if map.insert(entity, index).is_some() {
                return Err(SearchError::invalid_configuration(format!(
                    "entity type {} is bound to more than one index",
                    entity
                )));
            }
        }

        Ok(Self {
            state: RwLock::new(RegistryState {
                bindings: map,
                placeholder: None,
            }),
        })
    }

    /// Resolve the index for `entity`, binding it on first resolution.
    ///
    /// Concurrent first resolutions have a single winner: the first to take
    /// the write lock binds, later callers read the existing binding.
    pub fn resolve(&self, entity: EntityType) -> Result<String, SearchError> {
        if let Some(index) = self.state.read().bindings.get(&entity) {
            return Ok(index.clone());
        }

        let mut state = self.state.write();
        for step in RESOLUTION_ORDER {
            if let Some(index) = state.try_step(step, entity)? {
                return Ok(index);
            }
        }

        Err(SearchError::not_found(format!(
            "No index is bound to entity type {}",
            entity
        )))
    }

    /// Resolve the index for the document type `T`.
    pub fn resolve_for<T: Document>(&self) -> Result<String, SearchError> {
        self.resolve(EntityType::of::<T>())
    }

    /// The current binding for `entity`, without resolving.
    pub fn binding(&self, entity: EntityType) -> Option<String> {
        self.state.read().bindings.get(&entity).cloned()
    }

    /// Whether the placeholder index is still unconsumed.
    pub fn has_placeholder(&self) -> bool {
        self.state.read().placeholder.is_some()
    }
}
