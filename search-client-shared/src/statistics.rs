use serde::{Deserialize, Serialize};

/// Document count and storage usage of an index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStatistics {
    /// Number of documents in the index.
    pub document_count: u64,
    /// Storage used by the index, in bytes.
    pub storage_size_bytes: u64,
}
