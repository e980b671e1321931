//! Field schema and scoring profile types used in index definitions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Data type of an indexed field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// Analyzed full-text string.
    Text,
    /// Exact-match string.
    Keyword,
    /// 32-bit integer.
    Integer,
    /// 64-bit integer.
    Long,
    /// Double precision float.
    Double,
    /// Boolean flag.
    Boolean,
    /// Timestamp.
    Date,
    /// Latitude/longitude pair.
    GeoPoint,
    /// Nested JSON object.
    Object,
}

/// A single field in an index schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Field name as it appears in the serialized document.
    pub name: String,
    /// Data type of the field.
    pub field_type: FieldType,
    /// Whether this field holds the document key.
    pub key: bool,
    /// Whether the field takes part in full-text search.
    pub searchable: bool,
    /// Whether the field can be used in filters.
    pub filterable: bool,
    /// Whether results can be ordered by the field.
    pub sortable: bool,
}

impl FieldDefinition {
    /// Create a field that is stored but neither searchable, filterable nor sortable.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            key: false,
            searchable: false,
            filterable: false,
            sortable: false,
        }
    }

    /// Create the key field: a filterable keyword.
    pub fn key(name: impl Into<String>) -> Self {
        Self {
            key: true,
            filterable: true,
            ..Self::new(name, FieldType::Keyword)
        }
    }

    /// Mark the field as searchable.
    pub fn searchable(mut self) -> Self {
        self.searchable = true;
        self
    }

    /// Mark the field as filterable.
    pub fn filterable(mut self) -> Self {
        self.filterable = true;
        self
    }

    /// Mark the field as sortable.
    pub fn sortable(mut self) -> Self {
        self.sortable = true;
        self
    }
}

/// A named ranking configuration selectable per index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringProfile {
    /// Profile name.
    pub name: String,
    /// Relative weight per searchable field.
    pub text_weights: BTreeMap<String, f64>,
}

impl ScoringProfile {
    /// Create an empty profile.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text_weights: BTreeMap::new(),
        }
    }

    /// Weight a field.
    pub fn with_weight(mut self, field: impl Into<String>, weight: f64) -> Self {
        self.text_weights.insert(field.into(), weight);
        self
    }
}

/// Scoring profiles to attach when an index is created.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Profiles defined on the index.
    pub profiles: Vec<ScoringProfile>,
    /// Profile applied when a query names none.
    pub default_profile: Option<String>,
}

impl ScoringConfig {
    /// Create a config from a set of profiles.
    pub fn new(profiles: Vec<ScoringProfile>) -> Self {
        Self {
            profiles,
            default_profile: None,
        }
    }

    /// Set the default profile.
    pub fn with_default(mut self, name: impl Into<String>) -> Self {
        self.default_profile = Some(name.into());
        self
    }
}
