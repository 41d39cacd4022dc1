//! Expression AST definitions.

use crate::expression::operator::{BinaryOperator, UnaryOperator};
use crate::value::Value;

/// Expression tree node
///
/// Trees are immutable once built; combining two trees produces a new
/// node that owns both.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Column reference, optionally qualified as `table.column`
    Column(String),

    /// Literal constant value, bound as a parameter
    Literal(Value),

    /// Binary operation, including the AND/OR combinators
    BinaryOp {
        op: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },

    /// Unary operation, including NOT
    UnaryOp {
        op: UnaryOperator,
        operand: Box<Expression>,
    },

    /// Scalar function call such as `LOWER(name)`
    FunctionCall { name: String, args: Vec<Expression> },

    /// Set membership
    In {
        expr: Box<Expression>,
        list: Vec<Expression>,
        negated: bool,
    },
}

impl Expression {
    /// Create a column reference expression
    pub fn column(name: impl Into<String>) -> Self {
        Expression::Column(name.into())
    }

    /// Create a literal expression
    pub fn literal(value: impl Into<Value>) -> Self {
        Expression::Literal(value.into())
    }

    /// Create a binary operation expression
    pub fn binary_op(op: BinaryOperator, left: Expression, right: Expression) -> Self {
        Expression::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Create a unary operation expression
    pub fn unary_op(op: UnaryOperator, operand: Expression) -> Self {
        Expression::UnaryOp {
            op,
            operand: Box::new(operand),
        }
    }

    /// Create a function call expression
    pub fn function(name: impl Into<String>, args: Vec<Expression>) -> Self {
        Expression::FunctionCall {
            name: name.into(),
            args,
        }
    }

    /// Create an IN expression
    pub fn in_list(expr: Expression, list: Vec<Expression>) -> Self {
        Expression::In {
            expr: Box::new(expr),
            list,
            negated: false,
        }
    }

    /// Create a NOT IN expression
    pub fn not_in_list(expr: Expression, list: Vec<Expression>) -> Self {
        Expression::In {
            expr: Box::new(expr),
            list,
            negated: true,
        }
    }

    pub fn and(left: Expression, right: Expression) -> Self {
        Self::binary_op(BinaryOperator::And, left, right)
    }

    pub fn or(left: Expression, right: Expression) -> Self {
        Self::binary_op(BinaryOperator::Or, left, right)
    }

    pub fn not_expr(operand: Expression) -> Self {
        Self::unary_op(UnaryOperator::Not, operand)
    }

    pub fn eq(left: Expression, right: Expression) -> Self {
        Self::binary_op(BinaryOperator::Eq, left, right)
    }

    pub fn ne(left: Expression, right: Expression) -> Self {
        Self::binary_op(BinaryOperator::Ne, left, right)
    }

    pub fn lt(left: Expression, right: Expression) -> Self {
        Self::binary_op(BinaryOperator::Lt, left, right)
    }

    pub fn le(left: Expression, right: Expression) -> Self {
        Self::binary_op(BinaryOperator::Le, left, right)
    }

    pub fn gt(left: Expression, right: Expression) -> Self {
        Self::binary_op(BinaryOperator::Gt, left, right)
    }

    pub fn ge(left: Expression, right: Expression) -> Self {
        Self::binary_op(BinaryOperator::Ge, left, right)
    }

    pub fn is_null(operand: Expression) -> Self {
        Self::unary_op(UnaryOperator::IsNull, operand)
    }

    pub fn is_not_null(operand: Expression) -> Self {
        Self::unary_op(UnaryOperator::IsNotNull, operand)
    }

    /// AND together any number of trees. Returns None for an empty input.
    pub fn all(exprs: impl IntoIterator<Item = Expression>) -> Option<Self> {
        exprs.into_iter().reduce(Self::and)
    }

    /// OR together any number of trees. Returns None for an empty input.
    pub fn any(exprs: impl IntoIterator<Item = Expression>) -> Option<Self> {
        exprs.into_iter().reduce(Self::or)
    }

    /// Check if this expression is a constant (contains no column references)
    pub fn is_constant(&self) -> bool {
        match self {
            Expression::Literal(_) => true,
            Expression::Column(_) => false,
            Expression::BinaryOp { left, right, .. } => left.is_constant() && right.is_constant(),
            Expression::UnaryOp { operand, .. } => operand.is_constant(),
            Expression::FunctionCall { args, .. } => args.iter().all(Expression::is_constant),
            Expression::In { expr, list, .. } => {
                expr.is_constant() && list.iter().all(Expression::is_constant)
            }
        }
    }
}
