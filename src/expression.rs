//! Expression trees for tree-style filters.
//!
//! This module provides:
//! - Expression AST representation
//! - An explicit builder handing out column, operator and function handles
//! - Compilation of a tree into a parenthesized, parameterized SQL fragment

pub mod builder;
pub mod compile;
pub mod expr;
pub mod operator;

pub use builder::ExpressionBuilder;
pub use compile::{compile_expression, quote_identifier, CompiledExpression};
pub use expr::Expression;
pub use operator::{BinaryOperator, UnaryOperator};
