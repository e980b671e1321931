//! Bulk request lines and per-item results.

use serde_json::{json, Value};

use crate::batch::{IndexBatch, IndexingResult, MutationKind};

/// Convert a batch into bulk request lines, preserving action order.
pub fn to_bulk_lines(index: &str, batch: &IndexBatch) -> Vec<Value> {
    let mut lines = Vec::with_capacity(batch.len() * 2);

    for action in &batch.actions {
        let meta = json!({ "_index": index, "_id": action.key });
        match action.kind {
            MutationKind::Upload => {
                lines.push(json!({ "index": meta }));
                lines.push(action.document.clone());
            }
            MutationKind::Delete => {
                lines.push(json!({ "delete": meta }));
            }
            MutationKind::Merge => {
                lines.push(json!({ "update": meta }));
                lines.push(json!({ "doc": action.document }));
            }
            MutationKind::MergeOrUpload => {
                lines.push(json!({ "update": meta }));
                lines.push(json!({ "doc": action.document, "doc_as_upsert": true }));
            }
        }
    }

    lines
}

/// Parse the `items` array of a bulk response into per-document results.
///
/// Returns `None` when the response carries no `items` array. Deleting a
/// document that does not exist counts as acknowledged.
pub fn parse_bulk_items(body: &Value) -> Option<Vec<IndexingResult>> {
    let items = body.get("items")?.as_array()?;

    let results = items
        .iter()
        .filter_map(|item| {
            let (operation, status) = item.as_object()?.iter().next()?;
            let key = status["_id"].as_str().unwrap_or_default().to_string();
            let code = status["status"]
                .as_u64()
                .and_then(|code| u16::try_from(code).ok())
                .unwrap_or(0);

            let succeeded = (200..300).contains(&code) || (operation == "delete" && code == 404);
            if succeeded {
                return Some(IndexingResult::acknowledged(key, code));
            }

            let reason = status["error"]["reason"]
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| format!("status {}", code));
            Some(IndexingResult::failed(key, code, reason))
        })
        .collect();

    Some(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::IndexAction;

    fn action(kind: MutationKind, key: &str) -> IndexAction {
        IndexAction {
            kind,
            key: key.to_string(),
            document: json!({ "id": key }),
        }
    }

    #[test]
    fn test_bulk_lines() {
        let batch = IndexBatch {
            actions: vec![
                action(MutationKind::Upload, "1"),
                action(MutationKind::Delete, "2"),
                action(MutationKind::Merge, "3"),
                action(MutationKind::MergeOrUpload, "4"),
            ],
        };

        let lines = to_bulk_lines("hotels", &batch);

        assert_eq!(lines.len(), 7);
        assert_eq!(lines[0], json!({ "index": { "_index": "hotels", "_id": "1" } }));
        assert_eq!(lines[1], json!({ "id": "1" }));
        assert_eq!(lines[2], json!({ "delete": { "_index": "hotels", "_id": "2" } }));
        assert_eq!(lines[3], json!({ "update": { "_index": "hotels", "_id": "3" } }));
        assert_eq!(lines[4], json!({ "doc": { "id": "3" } }));
        assert_eq!(lines[6], json!({ "doc": { "id": "4" }, "doc_as_upsert": true }));
    }

    #[test]
    fn test_parse_bulk_items() {
        let body = json!({
            "took": 3,
            "errors": true,
            "items": [
                { "index": { "_id": "1", "status": 201, "result": "created" } },
                { "update": { "_id": "2", "status": 400, "error": { "type": "mapper_parsing_exception", "reason": "failed to parse field [rating]" } } },
                { "delete": { "_id": "3", "status": 404, "result": "not_found" } },
                { "update": { "_id": "4", "status": 404, "error": { "type": "document_missing_exception", "reason": "document missing" } } }
            ]
        });

        let results = parse_bulk_items(&body).unwrap();

        assert_eq!(results.len(), 4);
        assert!(results[0].succeeded);
        assert!(!results[1].succeeded);
        assert_eq!(results[1].error_message.as_deref(), Some("failed to parse field [rating]"));
        assert!(results[2].succeeded);
        assert!(!results[3].succeeded);
    }

    #[test]
    fn test_parse_bulk_items_missing() {
        assert!(parse_bulk_items(&json!({ "took": 1 })).is_none());
    }

    #[test]
    fn test_out_of_range_status_is_a_failure() {
        let body = json!({
            "items": [
                { "index": { "_id": "1", "status": 65737 } }
            ]
        });

        let results = parse_bulk_items(&body).unwrap();

        assert!(!results[0].succeeded);
        assert_eq!(results[0].status, 0);
    }
}
