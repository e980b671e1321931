//! Query expressions.
//!
//! An `Expression` is a source entity type plus the operators applied to it,
//! kept in application order. Expressions are immutable; applying an
//! operator produces a new expression.

use std::any::type_name;

use serde_json::Value;

use search_client_shared::{Document, EntityType, SearchParameters, SortField};

use crate::errors::SearchError;

/// A query operator.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOperator {
    /// Full-text search. A later search replaces an earlier one.
    Search(String),
    /// A query-DSL clause every hit must satisfy.
    Filter(Value),
    /// A sort key, less significant than the keys before it.
    OrderBy { field: String, descending: bool },
    /// Skip the first `n` hits.
    Skip(usize),
    /// Keep at most `n` hits.
    Take(usize),
    /// Return only `fields`, decoded as `element_type`.
    Select {
        fields: Vec<String>,
        element_type: &'static str,
    },
}

impl QueryOperator {
    fn name(&self) -> &'static str {
        match self {
            Self::Search(_) => "search",
            Self::Filter(_) => "filter",
            Self::OrderBy { .. } => "order_by",
            Self::Skip(_) => "skip",
            Self::Take(_) => "take",
            Self::Select { .. } => "select",
        }
    }
}

/// A source entity type and the operators applied to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    source: EntityType,
    operators: Vec<QueryOperator>,
}

impl Expression {
    /// The root expression over all documents of type `T`.
    pub fn source<T: Document>() -> Self {
        Self {
            source: EntityType::of::<T>(),
            operators: Vec::new(),
        }
    }

    /// The entity type the expression reads from.
    pub fn entity(&self) -> EntityType {
        self.source
    }

    /// Operators in application order.
    pub fn operators(&self) -> &[QueryOperator] {
        &self.operators
    }

    /// Type name of the elements the expression yields: the source type, or
    /// the type of the last projection.
    pub fn element_type(&self) -> &'static str {
        self.operators
            .iter()
            .rev()
            .find_map(|op| match op {
                QueryOperator::Select { element_type, .. } => Some(*element_type),
                _ => None,
            })
            .unwrap_or_else(|| self.source.name())
    }

    /// Whether the expression yields elements of type `R`.
    pub fn yields<R>(&self) -> bool {
        self.element_type() == type_name::<R>()
    }

    /// A new expression with `operator` appended.
    pub fn apply(&self, operator: QueryOperator) -> Self {
        let mut operators = self.operators.clone();
        operators.push(operator);
        Self {
            source: self.source,
            operators,
        }
    }

    /// Translate the operators, in order, into search parameters and a
    /// search text.
    ///
    /// Paging composes the way the operators read: `skip(10).take(5)` returns
    /// hits 10 to 14, `take(5).skip(2)` returns hits 2 to 4. A search, filter
    /// or sort applied after `skip` or `take` would act on the paged window,
    /// which a single request cannot express, so it is rejected with
    /// `SearchError::InvalidArgument`.
    pub fn to_parameters(&self) -> Result<(SearchParameters, Option<String>), SearchError> {
        let mut parameters = SearchParameters::new();
        let mut search_text = None;
        let mut skip = 0usize;
        let mut top: Option<usize> = None;
        let mut paged = false;

        for operator in &self.operators {
            match operator {
                QueryOperator::Search(_) | QueryOperator::Filter(_) | QueryOperator::OrderBy { .. }
                    if paged =>
                {
                    return Err(SearchError::invalid_argument(format!(
                        "{} cannot follow skip or take",
                        operator.name()
                    )));
                }
                QueryOperator::Search(text) => search_text = Some(text.clone()),
                QueryOperator::Filter(clause) => parameters.filters.push(clause.clone()),
                QueryOperator::OrderBy { field, descending } => parameters.order_by.push(SortField {
                    field: field.clone(),
                    descending: *descending,
                }),
                QueryOperator::Skip(n) => {
                    paged = true;
                    skip = skip.saturating_add(*n);
                    top = top.map(|t| t.saturating_sub(*n));
                }
                QueryOperator::Take(n) => {
                    paged = true;
                    top = Some(top.map_or(*n, |t| t.min(*n)));
                }
                QueryOperator::Select { fields, .. } => parameters.select = fields.clone(),
            }
        }

        if skip > 0 {
            parameters.skip = Some(skip);
        }
        parameters.top = top;

        Ok((parameters, search_text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Serialize, Deserialize)]
    struct Hotel {
        id: String,
    }

    impl Document for Hotel {
        fn key(&self) -> String {
            self.id.clone()
        }
    }

    #[derive(Deserialize)]
    struct HotelName {
        #[allow(dead_code)]
        name: String,
    }

    #[test]
    fn test_apply_does_not_mutate() {
        let root = Expression::source::<Hotel>();
        let filtered = root.apply(QueryOperator::Take(3));

        assert!(root.operators().is_empty());
        assert_eq!(filtered.operators(), &[QueryOperator::Take(3)]);
    }

    #[test]
    fn test_element_type_follows_projection() {
        let root = Expression::source::<Hotel>();
        assert!(root.yields::<Hotel>());

        let projected = root.apply(QueryOperator::Select {
            fields: vec!["name".to_string()],
            element_type: type_name::<HotelName>(),
        });
        assert!(projected.yields::<HotelName>());
        assert!(!projected.yields::<Hotel>());
    }

    #[test]
    fn test_to_parameters_preserves_order() {
        let expression = Expression::source::<Hotel>()
            .apply(QueryOperator::Search("spa".to_string()))
            .apply(QueryOperator::Filter(json!({ "term": { "city": "Lisbon" } })))
            .apply(QueryOperator::OrderBy {
                field: "rating".to_string(),
                descending: true,
            })
            .apply(QueryOperator::OrderBy {
                field: "name".to_string(),
                descending: false,
            })
            .apply(QueryOperator::Skip(10))
            .apply(QueryOperator::Take(5));

        let (parameters, text) = expression.to_parameters().unwrap();

        assert_eq!(text.as_deref(), Some("spa"));
        assert_eq!(parameters.filters.len(), 1);
        assert_eq!(
            parameters.order_by,
            vec![SortField::desc("rating"), SortField::asc("name")]
        );
        assert_eq!(parameters.skip, Some(10));
        assert_eq!(parameters.top, Some(5));
    }

    #[test]
    fn test_take_then_skip() {
        let expression = Expression::source::<Hotel>()
            .apply(QueryOperator::Take(5))
            .apply(QueryOperator::Skip(2))
            .apply(QueryOperator::Take(10));

        let (parameters, _) = expression.to_parameters().unwrap();

        assert_eq!(parameters.skip, Some(2));
        assert_eq!(parameters.top, Some(3));
    }

    #[test]
    fn test_order_by_after_take_is_rejected() {
        let ordered_then_paged = Expression::source::<Hotel>()
            .apply(QueryOperator::OrderBy {
                field: "rating".to_string(),
                descending: true,
            })
            .apply(QueryOperator::Take(5));
        let paged_then_ordered = Expression::source::<Hotel>()
            .apply(QueryOperator::Take(5))
            .apply(QueryOperator::OrderBy {
                field: "rating".to_string(),
                descending: true,
            });

        let (parameters, _) = ordered_then_paged.to_parameters().unwrap();
        assert_eq!(parameters.order_by, vec![SortField::desc("rating")]);
        assert_eq!(parameters.top, Some(5));

        assert!(matches!(
            paged_then_ordered.to_parameters(),
            Err(SearchError::InvalidArgument(msg)) if msg.contains("order_by")
        ));
    }

    #[test]
    fn test_filter_and_search_after_skip_are_rejected() {
        let filtered = Expression::source::<Hotel>()
            .apply(QueryOperator::Skip(2))
            .apply(QueryOperator::Filter(json!({ "term": { "city": "Lisbon" } })));
        let searched = Expression::source::<Hotel>()
            .apply(QueryOperator::Skip(2))
            .apply(QueryOperator::Search("spa".to_string()));

        assert!(matches!(
            filtered.to_parameters(),
            Err(SearchError::InvalidArgument(_))
        ));
        assert!(matches!(
            searched.to_parameters(),
            Err(SearchError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_select_after_take_is_allowed() {
        let expression = Expression::source::<Hotel>()
            .apply(QueryOperator::Take(3))
            .apply(QueryOperator::Select {
                fields: vec!["name".to_string()],
                element_type: type_name::<HotelName>(),
            });

        let (parameters, _) = expression.to_parameters().unwrap();

        assert_eq!(parameters.select, vec!["name".to_string()]);
        assert_eq!(parameters.top, Some(3));
    }

    #[test]
    fn test_skip_saturates() {
        let expression = Expression::source::<Hotel>()
            .apply(QueryOperator::Skip(usize::MAX))
            .apply(QueryOperator::Skip(1));

        let (parameters, _) = expression.to_parameters().unwrap();

        assert_eq!(parameters.skip, Some(usize::MAX));
    }
}
