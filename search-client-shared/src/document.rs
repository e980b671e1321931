//! Entity contract and type identity.

use std::any::{type_name, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{de::DeserializeOwned, Serialize};

use crate::schema::FieldDefinition;

/// Trait for entities that can be stored in a remote search index.
///
/// # Example
///
/// ```
/// use search_client_shared::{Document, FieldDefinition, FieldType};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Serialize, Deserialize)]
/// struct Hotel {
///     id: String,
///     name: String,
///     rating: f64,
/// }
///
/// impl Document for Hotel {
///     const INDEX_NAME: Option<&'static str> = Some("hotels");
///
///     fn key(&self) -> String {
///         self.id.clone()
///     }
///
///     fn fields() -> Vec<FieldDefinition> {
///         vec![
///             FieldDefinition::key("id"),
///             FieldDefinition::new("name", FieldType::Text).searchable(),
///             FieldDefinition::new("rating", FieldType::Double).sortable(),
///         ]
///     }
/// }
/// ```
pub trait Document: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Index name declared on the type itself.
    ///
    /// Consulted only when the connection has no explicit binding and no
    /// unconsumed placeholder index for this type. Blank names are ignored.
    const INDEX_NAME: Option<&'static str> = None;

    /// The document key, unique within its index.
    fn key(&self) -> String;

    /// Field schema used when the index is created.
    ///
    /// An empty schema lets the service infer mappings from the first
    /// documents it receives.
    fn fields() -> Vec<FieldDefinition> {
        Vec::new()
    }
}

/// Stable identity of an entity type, used as the index registry key.
///
/// Equality and hashing use the `TypeId` only; the name and the declared
/// index are carried along for diagnostics and fallback resolution.
#[derive(Clone, Copy)]
pub struct EntityType {
    id: TypeId,
    name: &'static str,
    declared_index: Option<&'static str>,
}

impl EntityType {
    /// Identity of the document type `T`.
    pub fn of<T: Document>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
            declared_index: T::INDEX_NAME,
        }
    }

    /// The Rust type name, e.g. `my_app::Hotel`.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The non-blank index name declared by the type, if any.
    pub fn declared_index(&self) -> Option<&'static str> {
        self.declared_index.filter(|name| !name.trim().is_empty())
    }
}

impl PartialEq for EntityType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for EntityType {}

impl Hash for EntityType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Serialize, Deserialize)]
    struct Plain {
        id: String,
    }

    impl Document for Plain {
        fn key(&self) -> String {
            self.id.clone()
        }
    }

    #[derive(Serialize, Deserialize)]
    struct Blank {
        id: String,
    }

    impl Document for Blank {
        const INDEX_NAME: Option<&'static str> = Some("   ");

        fn key(&self) -> String {
            self.id.clone()
        }
    }

    #[test]
    fn test_entity_type_identity() {
        assert_eq!(EntityType::of::<Plain>(), EntityType::of::<Plain>());
        assert_ne!(EntityType::of::<Plain>(), EntityType::of::<Blank>());
        assert!(EntityType::of::<Plain>().name().ends_with("Plain"));
    }

    #[test]
    fn test_blank_declared_index_is_ignored() {
        assert!(EntityType::of::<Plain>().declared_index().is_none());
        assert!(EntityType::of::<Blank>().declared_index().is_none());
    }
}
