//! The intermediate query object accumulated by chain calls.

use crate::expression::Expression;
use crate::query::condition::{Condition, JoinSpec, OrGroup, OrderBy};

/// Accumulated, not-yet-compiled state of one query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryObject {
    pub selected_columns: Vec<String>,
    pub conditions: Vec<Condition>,
    pub or_groups: Vec<OrGroup>,
    /// When present, supersedes `conditions` for the primary WHERE
    pub expression_filter: Option<Expression>,
    pub joins: Vec<JoinSpec>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub ordering: Vec<OrderBy>,
    pub eager_relations: Vec<String>,
    /// Rows come back flattened rather than in the base entity's shape
    pub raw_mode: bool,
}

impl QueryObject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_joins(&self) -> bool {
        !self.joins.is_empty()
    }

    /// Whether any predicate state has been accumulated
    pub fn is_filtered(&self) -> bool {
        self.expression_filter.is_some() || !self.conditions.is_empty() || !self.or_groups.is_empty()
    }

    /// AND a tree onto the existing tree filter, if any
    pub fn and_expression(&mut self, expr: Expression) {
        self.expression_filter = Some(match self.expression_filter.take() {
            Some(existing) => Expression::and(existing, expr),
            None => expr,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_query_object() {
        let iqo = QueryObject::new();
        assert!(!iqo.has_joins());
        assert!(!iqo.is_filtered());
        assert!(!iqo.raw_mode);
        assert!(iqo.limit.is_none());
    }

    #[test]
    fn test_and_expression_accumulates() {
        let mut iqo = QueryObject::new();
        iqo.and_expression(Expression::column("a"));
        assert_eq!(iqo.expression_filter, Some(Expression::column("a")));

        iqo.and_expression(Expression::column("b"));
        assert_eq!(
            iqo.expression_filter,
            Some(Expression::and(
                Expression::column("a"),
                Expression::column("b")
            ))
        );
        assert!(iqo.is_filtered());
    }
}
