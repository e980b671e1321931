//! Request and response types exchanged with the remote search service.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::SearchError;
use search_client_shared::{
    Document, FieldDefinition, ScoringConfig, ScoringProfile, SearchHit, SearchResults,
};

/// Definition of an index to be created on the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDefinition {
    /// Index name.
    pub name: String,
    /// Field schema.
    pub fields: Vec<FieldDefinition>,
    /// Scoring profiles attached to the index.
    pub scoring_profiles: Vec<ScoringProfile>,
    /// Profile applied when a query names none.
    pub default_scoring_profile: Option<String>,
}

impl IndexDefinition {
    /// Build the definition for the document type `T`, stored under `name`.
    pub fn for_document<T: Document>(name: impl Into<String>, scoring: Option<ScoringConfig>) -> Self {
        let scoring = scoring.unwrap_or_default();
        Self {
            name: name.into(),
            fields: T::fields(),
            scoring_profiles: scoring.profiles,
            default_scoring_profile: scoring.default_profile,
        }
    }
}

/// Raw search response as returned by the service.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceResponse {
    /// HTTP status code.
    pub status: u16,
    /// Diagnostic search identifier echoed by the service, if any.
    pub search_id: Option<String>,
    /// Response body.
    pub body: Value,
}

impl ServiceResponse {
    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The failure reason reported in the body, if any.
    pub fn failure_reason(&self) -> String {
        self.body
            .get("error")
            .and_then(|e| e.get("reason").or(Some(e)))
            .map(|reason| match reason {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .unwrap_or_else(|| format!("status {}", self.status))
    }

    /// Decode the hits of a successful response into typed results.
    pub fn into_results<T: Document>(self) -> Result<SearchResults<T>, SearchError> {
        let hits_section = &self.body["hits"];

        let total = hits_section["total"]["value"]
            .as_u64()
            .or_else(|| hits_section["total"].as_u64());

        let hits = hits_section["hits"]
            .as_array()
            .map(|hits| {
                hits.iter()
                    .map(|hit| {
                        let source = hit.get("_source").cloned().unwrap_or(Value::Null);
                        Ok(SearchHit {
                            score: hit["_score"].as_f64(),
                            document: serde_json::from_value(source)?,
                        })
                    })
                    .collect::<Result<Vec<_>, SearchError>>()
            })
            .transpose()?
            .unwrap_or_default();

        Ok(SearchResults { total, hits })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Hotel {
        id: String,
        name: String,
    }

    impl Document for Hotel {
        fn key(&self) -> String {
            self.id.clone()
        }

        fn fields() -> Vec<FieldDefinition> {
            vec![FieldDefinition::key("id")]
        }
    }

    #[test]
    fn test_definition_for_document() {
        let scoring = ScoringConfig::new(vec![ScoringProfile::new("p")]).with_default("p");
        let definition = IndexDefinition::for_document::<Hotel>("hotels", Some(scoring));

        assert_eq!(definition.name, "hotels");
        assert_eq!(definition.fields.len(), 1);
        assert_eq!(definition.scoring_profiles.len(), 1);
        assert_eq!(definition.default_scoring_profile.as_deref(), Some("p"));

        let bare = IndexDefinition::for_document::<Hotel>("hotels", None);
        assert!(bare.scoring_profiles.is_empty());
        assert!(bare.default_scoring_profile.is_none());
    }

    #[test]
    fn test_into_results() {
        let response = ServiceResponse {
            status: 200,
            search_id: None,
            body: json!({
                "hits": {
                    "total": { "value": 2, "relation": "eq" },
                    "hits": [
                        { "_score": 1.5, "_source": { "id": "1", "name": "Grand" } },
                        { "_score": null, "_source": { "id": "2", "name": "Plaza" } }
                    ]
                }
            }),
        };

        let results = response.into_results::<Hotel>().unwrap();

        assert_eq!(results.total, Some(2));
        assert_eq!(results.hits[0].score, Some(1.5));
        assert_eq!(results.hits[1].score, None);
        assert_eq!(results.hits[1].document.name, "Plaza");
    }

    #[test]
    fn test_into_results_bad_source() {
        let response = ServiceResponse {
            status: 200,
            search_id: None,
            body: json!({ "hits": { "hits": [ { "_source": { "unexpected": true } } ] } }),
        };

        let err = response.into_results::<Hotel>().unwrap_err();
        assert!(matches!(err, SearchError::Serialization(_)));
    }

    #[test]
    fn test_failure_reason() {
        let response = ServiceResponse {
            status: 400,
            search_id: None,
            body: json!({ "error": { "type": "parsing_exception", "reason": "unknown query [foo]" } }),
        };
        assert_eq!(response.failure_reason(), "unknown query [foo]");

        let response = ServiceResponse {
            status: 502,
            search_id: None,
            body: Value::Null,
        };
        assert_eq!(response.failure_reason(), "status 502");
    }
}
