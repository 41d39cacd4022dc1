//! Handle type for building expression trees inside filter callbacks.
//!
//! A callback passed to `QueryBuilder::filter_with` receives an
//! [`ExpressionBuilder`] and returns the tree it built:
//!
//! ```ignore
//! users.filter_with(|f| f.and(
//!     f.eq(f.lower(f.column("email")), f.value("a@b.c")),
//!     f.ge(f.column("age"), f.value(18)),
//! ));
//! ```

use crate::expression::{BinaryOperator, Expression};
use crate::value::Value;

/// Builder for creating filter expressions
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpressionBuilder;

impl ExpressionBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Create a column reference expression
    pub fn column(&self, name: impl Into<String>) -> Expression {
        Expression::column(name)
    }

    /// Create a literal value expression
    pub fn value(&self, val: impl Into<Value>) -> Expression {
        Expression::literal(val)
    }

    /// Create a NULL literal
    pub fn null(&self) -> Expression {
        Expression::literal(Value::Null)
    }

    pub fn eq(&self, left: Expression, right: Expression) -> Expression {
        Expression::eq(left, right)
    }

    pub fn ne(&self, left: Expression, right: Expression) -> Expression {
        Expression::ne(left, right)
    }

    pub fn lt(&self, left: Expression, right: Expression) -> Expression {
        Expression::lt(left, right)
    }

    pub fn le(&self, left: Expression, right: Expression) -> Expression {
        Expression::le(left, right)
    }

    pub fn gt(&self, left: Expression, right: Expression) -> Expression {
        Expression::gt(left, right)
    }

    pub fn ge(&self, left: Expression, right: Expression) -> Expression {
        Expression::ge(left, right)
    }

    pub fn and(&self, left: Expression, right: Expression) -> Expression {
        Expression::and(left, right)
    }

    pub fn or(&self, left: Expression, right: Expression) -> Expression {
        Expression::or(left, right)
    }

    pub fn not(&self, expr: Expression) -> Expression {
        Expression::not_expr(expr)
    }

    pub fn is_null(&self, expr: Expression) -> Expression {
        Expression::is_null(expr)
    }

    pub fn is_not_null(&self, expr: Expression) -> Expression {
        Expression::is_not_null(expr)
    }

    /// Create a LIKE comparison against a pattern
    pub fn like(&self, expr: Expression, pattern: impl Into<String>) -> Expression {
        Expression::binary_op(
            BinaryOperator::Like,
            expr,
            Expression::literal(Value::Text(pattern.into())),
        )
    }

    /// Create a set membership test over literal values
    pub fn in_list<V: Into<Value>>(
        &self,
        expr: Expression,
        values: impl IntoIterator<Item = V>,
    ) -> Expression {
        Expression::in_list(expr, values.into_iter().map(Expression::literal).collect())
    }

    /// Call an arbitrary scalar function
    pub fn call(&self, name: impl Into<String>, args: Vec<Expression>) -> Expression {
        Expression::function(name, args)
    }

    pub fn lower(&self, expr: Expression) -> Expression {
        self.call("LOWER", vec![expr])
    }

    pub fn upper(&self, expr: Expression) -> Expression {
        self.call("UPPER", vec![expr])
    }

    pub fn length(&self, expr: Expression) -> Expression {
        self.call("LENGTH", vec![expr])
    }

    pub fn trim(&self, expr: Expression) -> Expression {
        self.call("TRIM", vec![expr])
    }

    pub fn abs(&self, expr: Expression) -> Expression {
        self.call("ABS", vec![expr])
    }

    pub fn coalesce(&self, args: Vec<Expression>) -> Expression {
        self.call("COALESCE", args)
    }
}
