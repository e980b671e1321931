//! OpenSearch index settings and mappings.
//!
//! This module turns an `IndexDefinition` into the body of a create-index
//! request. Scoring profiles have no native OpenSearch counterpart and are
//! kept in the mapping's `_meta` section.

use serde_json::{json, Map, Value};

use crate::types::IndexDefinition;
use search_client_shared::{FieldDefinition, FieldType};

/// Get the create-index body for a definition.
pub fn get_index_body(definition: &IndexDefinition) -> Value {
    let mut mappings = Map::new();

    if !definition.fields.is_empty() {
        let properties: Map<String, Value> = definition
            .fields
            .iter()
            .map(|field| (field.name.clone(), field_mapping(field)))
            .collect();
        mappings.insert("properties".to_string(), Value::Object(properties));
    }

    if !definition.scoring_profiles.is_empty() || definition.default_scoring_profile.is_some() {
        mappings.insert(
            "_meta".to_string(),
            json!({
                "scoring_profiles": definition.scoring_profiles,
                "default_scoring_profile": definition.default_scoring_profile,
            }),
        );
    }

    if mappings.is_empty() {
        return json!({});
    }

    json!({ "mappings": mappings })
}

fn type_name(field_type: FieldType) -> &'static str {
    match field_type {
        FieldType::Text => "text",
        FieldType::Keyword => "keyword",
        FieldType::Integer => "integer",
        FieldType::Long => "long",
        FieldType::Double => "double",
        FieldType::Boolean => "boolean",
        FieldType::Date => "date",
        FieldType::GeoPoint => "geo_point",
        FieldType::Object => "object",
    }
}

fn field_mapping(field: &FieldDefinition) -> Value {
    let mut mapping = Map::new();
    mapping.insert("type".to_string(), json!(type_name(field.field_type)));

    match field.field_type {
        FieldType::Text => {
            // Text cannot be sorted or filtered on directly
            if field.sortable || field.filterable {
                mapping.insert("fields".to_string(), json!({ "raw": { "type": "keyword" } }));
            }
            if !field.searchable {
                mapping.insert("index".to_string(), json!(false));
            }
        }
        FieldType::Object => {}
        _ => {
            if !(field.key || field.searchable || field.filterable || field.sortable) {
                mapping.insert("index".to_string(), json!(false));
            }
        }
    }

    Value::Object(mapping)
}
