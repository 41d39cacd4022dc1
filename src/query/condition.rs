//! Flat filter conditions, OR groups, joins and ordering entries.

use crate::value::Value;
use std::fmt;
use std::str::FromStr;

/// Comparison operators available to object-style filters besides equality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RangeOp {
    Gt,
    Gte,
    Lt,
    Lte,
    Ne,
}

impl RangeOp {
    /// Resolve an operator key such as `$gt`. `$in` is not a range operator.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "$gt" => Some(RangeOp::Gt),
            "$gte" => Some(RangeOp::Gte),
            "$lt" => Some(RangeOp::Lt),
            "$lte" => Some(RangeOp::Lte),
            "$ne" => Some(RangeOp::Ne),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RangeOp::Gt => ">",
            RangeOp::Gte => ">=",
            RangeOp::Lt => "<",
            RangeOp::Lte => "<=",
            RangeOp::Ne => "!=",
        }
    }
}

/// The right-hand side of a flat condition, resolved once when the filter
/// is added and never re-inspected
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Equality(Value),
    Range(RangeOp, Value),
    InSet(Vec<Value>),
}

/// A single `field OP value` predicate
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: String,
    pub value: FilterValue,
}

impl Condition {
    pub fn new(field: impl Into<String>, value: FilterValue) -> Self {
        Self {
            field: field.into(),
            value,
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterValue::Equality(value.into()))
    }

    pub fn range(field: impl Into<String>, op: RangeOp, value: impl Into<Value>) -> Self {
        Self::new(field, FilterValue::Range(op, value.into()))
    }

    pub fn in_set<V: Into<Value>>(
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self::new(
            field,
            FilterValue::InSet(values.into_iter().map(Into::into).collect()),
        )
    }

    /// SQL operator this condition compiles to
    pub fn operator(&self) -> &'static str {
        match &self.value {
            FilterValue::Equality(_) => "=",
            FilterValue::Range(op, _) => op.as_str(),
            FilterValue::InSet(_) => "IN",
        }
    }
}

/// Conditions combined with OR; each group is ANDed onto the main predicate
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrGroup {
    pub conditions: Vec<Condition>,
}

impl OrGroup {
    pub fn new(conditions: Vec<Condition>) -> Self {
        Self { conditions }
    }
}

/// An inner join from the base table onto another table
#[derive(Debug, Clone, PartialEq)]
pub struct JoinSpec {
    pub table: String,
    /// Column on the base table
    pub from_column: String,
    /// Column on the joined table
    pub to_column: String,
    /// Columns to project from the joined table; empty means all
    pub columns: Vec<String>,
}

impl JoinSpec {
    pub fn new(
        table: impl Into<String>,
        from_column: impl Into<String>,
        to_column: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            from_column: from_column.into(),
            to_column: to_column.into(),
            columns: Vec::new(),
        }
    }

    pub fn with_columns<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }
}

/// Sort direction for an ordering entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(format!("Unknown sort direction: {}", other)),
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One ORDER BY entry
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub direction: SortDirection,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_op_keys() {
        assert_eq!(RangeOp::from_key("$gt"), Some(RangeOp::Gt));
        assert_eq!(RangeOp::from_key("$gte"), Some(RangeOp::Gte));
        assert_eq!(RangeOp::from_key("$lt"), Some(RangeOp::Lt));
        assert_eq!(RangeOp::from_key("$lte"), Some(RangeOp::Lte));
        assert_eq!(RangeOp::from_key("$ne"), Some(RangeOp::Ne));
        assert_eq!(RangeOp::from_key("$in"), None);
        assert_eq!(RangeOp::from_key("$like"), None);
    }

    #[test]
    fn test_condition_operator() {
        assert_eq!(Condition::eq("a", 1).operator(), "=");
        assert_eq!(Condition::range("a", RangeOp::Gte, 1).operator(), ">=");
        assert_eq!(Condition::range("a", RangeOp::Ne, 1).operator(), "!=");
        assert_eq!(Condition::in_set("a", [1, 2]).operator(), "IN");
    }

    #[test]
    fn test_sort_direction_parse() {
        assert_eq!("asc".parse::<SortDirection>(), Ok(SortDirection::Asc));
        assert_eq!("DESC".parse::<SortDirection>(), Ok(SortDirection::Desc));
        assert_eq!("Desc".parse::<SortDirection>(), Ok(SortDirection::Desc));
        assert!("sideways".parse::<SortDirection>().is_err());
        assert_eq!(SortDirection::Desc.to_string(), "DESC");
    }
}
