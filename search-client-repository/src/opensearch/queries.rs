//! OpenSearch query builders.
//!
//! This module builds the `_search` request body from search parameters
//! and an optional search text.

use serde_json::{json, Map, Value};

use search_client_shared::{ScoringProfile, SearchParameters, SortField};

/// Build an OpenSearch search body.
///
/// The body combines:
/// - `simple_query_string` over the search fields when a search text is given,
///   boosted by the scoring profile's field weights
/// - every filter clause under `bool.filter`
/// - sort keys in the order they were added
/// - paging (`from`/`size`) and `_source` filtering
pub fn build_search_body(parameters: &SearchParameters, search_text: Option<&str>) -> Value {
    let mut body = Map::new();

    body.insert("query".to_string(), build_query(parameters, search_text));

    if !parameters.order_by.is_empty() {
        let sort: Vec<Value> = parameters.order_by.iter().map(build_sort).collect();
        body.insert("sort".to_string(), Value::Array(sort));
    }
    if let Some(skip) = parameters.skip {
        body.insert("from".to_string(), json!(skip));
    }
    if let Some(top) = parameters.top {
        body.insert("size".to_string(), json!(top));
    }
    if !parameters.select.is_empty() {
        body.insert("_source".to_string(), json!(parameters.select));
    }
    if parameters.include_total_count {
        body.insert("track_total_hits".to_string(), json!(true));
    }

    Value::Object(body)
}

fn build_query(parameters: &SearchParameters, search_text: Option<&str>) -> Value {
    let text = search_text.map(str::trim).filter(|t| !t.is_empty() && *t != "*");

    let must = match text {
        Some(text) => build_text_query(
            text,
            &weighted_fields(&parameters.search_fields, parameters.scoring_profile.as_ref()),
        ),
        None => json!({ "match_all": {} }),
    };

    if parameters.filters.is_empty() {
        return must;
    }

    json!({
        "bool": {
            "must": [must],
            "filter": parameters.filters
        }
    })
}

/// Build the full-text clause.
///
/// `simple_query_string` accepts user input without failing on syntax
/// errors, which suits free text typed into a search box.
fn build_text_query(text: &str, fields: &[String]) -> Value {
    if fields.is_empty() {
        return json!({
            "simple_query_string": {
                "query": text,
                "default_operator": "or"
            }
        });
    }

    json!({
        "simple_query_string": {
            "query": text,
            "fields": fields,
            "default_operator": "or"
        }
    })
}

/// Apply profile weights to the search fields as `field^weight` boosts.
///
/// With no explicit fields, every weighted field is boosted and `*` keeps
/// the remaining fields searchable.
fn weighted_fields(fields: &[String], profile: Option<&ScoringProfile>) -> Vec<String> {
    let weights = match profile {
        Some(profile) if !profile.text_weights.is_empty() => &profile.text_weights,
        _ => return fields.to_vec(),
    };

    if fields.is_empty() {
        let mut boosted: Vec<String> = weights
            .iter()
            .map(|(field, weight)| format!("{}^{}", field, weight))
            .collect();
        boosted.push("*".to_string());
        return boosted;
    }

    fields
        .iter()
        .map(|field| match weights.get(field) {
            Some(weight) => format!("{}^{}", field, weight),
            None => field.clone(),
        })
        .collect()
}

fn build_sort(sort: &SortField) -> Value {
    let order = if sort.descending { "desc" } else { "asc" };
    json!({ sort.field.clone(): { "order": order } })
}
