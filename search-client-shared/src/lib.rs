//! # Search Client Shared
//!
//! Plain data types shared by every layer of the typed search client: the
//! entity contract, field schema and scoring types, search parameters, and
//! the typed results handed back to callers.

mod document;
mod schema;
mod search;
mod statistics;

pub use document::{Document, EntityType};
pub use schema::{FieldDefinition, FieldType, ScoringConfig, ScoringProfile};
pub use search::{SearchHit, SearchParameters, SearchResults, SortField};
pub use statistics::IndexStatistics;
