//! Compilation of expression trees into SQL fragments.
//!
//! The traversal is post-order and emits placeholders left to right, so the
//! parameter list lines up with the `?` markers in the fragment. Every
//! operator node is wrapped in parentheses, which makes the output
//! unambiguous however deeply trees are nested or combined.
//!
//! Literals are bound exactly as stored in the tree. Unlike object-style
//! filters, no date or boolean conversion is applied here.

use crate::expression::{Expression, UnaryOperator};
use crate::value::Value;

/// A compiled SQL fragment together with its positional parameters
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledExpression {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Compile an expression tree into a parameterized SQL fragment
pub fn compile_expression(expr: &Expression) -> CompiledExpression {
    let mut params = Vec::new();
    let sql = write_expression(expr, &mut params);
    CompiledExpression { sql, params }
}

/// Quote an identifier, quoting each segment of a dotted name separately
pub fn quote_identifier(name: &str) -> String {
    name.split('.')
        .map(|segment| format!("\"{}\"", segment.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(".")
}

fn write_expression(expr: &Expression, params: &mut Vec<Value>) -> String {
    match expr {
        Expression::Column(name) => quote_identifier(name),

        Expression::Literal(value) => {
            params.push(value.clone());
            "?".to_string()
        }

        Expression::BinaryOp { op, left, right } => {
            let left = write_expression(left, params);
            let right = write_expression(right, params);
            format!("({} {} {})", left, op.as_str(), right)
        }

        Expression::UnaryOp { op, operand } => {
            let operand = write_expression(operand, params);
            match op {
                _ if op.is_postfix() => format!("({} {})", operand, op.as_str()),
                UnaryOperator::Minus => format!("(-{})", operand),
                _ => format!("({} {})", op.as_str(), operand),
            }
        }

        Expression::FunctionCall { name, args } => {
            let args: Vec<String> = args
                .iter()
                .map(|arg| write_expression(arg, params))
                .collect();
            format!("{}({})", name, args.join(", "))
        }

        Expression::In {
            expr,
            list,
            negated,
        } => {
            // An empty set matches nothing; its negation matches everything
            if list.is_empty() {
                return if *negated { "(1 = 1)" } else { "(1 = 0)" }.to_string();
            }
            let expr = write_expression(expr, params);
            let items: Vec<String> = list
                .iter()
                .map(|item| write_expression(item, params))
                .collect();
            let keyword = if *negated { "NOT IN" } else { "IN" };
            format!("({} {} ({}))", expr, keyword, items.join(", "))
        }
    }
}
