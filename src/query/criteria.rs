//! Object-style filter input.
//!
//! A [`Criteria`] is an ordered list of `field → value` entries where the
//! value is either a plain scalar (equality), a list (set membership), or an
//! operator map keyed by `$gt`, `$gte`, `$lt`, `$lte`, `$ne` and `$in`. The
//! reserved field `$or` holds a list of branch criteria whose conditions are
//! ORed together into a single group.
//!
//! Criteria are resolved into [`Condition`]s when the filter is added to a
//! query, so an unknown operator fails at that call rather than at compile
//! time.

use crate::error::{QueryError, Result};
use crate::query::condition::{Condition, FilterValue, OrGroup, RangeOp};
use crate::value::Value;

/// Reserved key introducing an OR group
pub const OR_KEY: &str = "$or";

/// Operator key for set membership
pub const IN_KEY: &str = "$in";

/// Right-hand side of a criteria entry before operator resolution
#[derive(Debug, Clone, PartialEq)]
pub enum CriteriaValue {
    Scalar(Value),
    List(Vec<Value>),
    Operators(Vec<(String, CriteriaValue)>),
    Branches(Vec<Criteria>),
}

macro_rules! scalar_criteria_value {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for CriteriaValue {
                fn from(value: $ty) -> Self {
                    CriteriaValue::Scalar(value.into())
                }
            }
        )*
    };
}

scalar_criteria_value!(Value, bool, i32, i64, f64, &str, String);

impl From<Vec<Value>> for CriteriaValue {
    fn from(values: Vec<Value>) -> Self {
        CriteriaValue::List(values)
    }
}

/// Ordered object-style filter
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Criteria {
    entries: Vec<(String, CriteriaValue)>,
}

/// Conditions produced by resolving a [`Criteria`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedCriteria {
    pub conditions: Vec<Condition>,
    pub or_groups: Vec<OrGroup>,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a raw entry
    pub fn entry(mut self, field: impl Into<String>, value: CriteriaValue) -> Self {
        self.entries.push((field.into(), value));
        self
    }

    /// `field = value`
    pub fn eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.entry(field, CriteriaValue::Scalar(value.into()))
    }

    /// `field IN (values...)`
    pub fn is_in<V: Into<Value>>(
        self,
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.entry(
            field,
            CriteriaValue::List(values.into_iter().map(Into::into).collect()),
        )
    }

    /// Add an operator entry such as `("age", "$gt", 18)`.
    ///
    /// Operators on the same field accumulate into one operator map.
    pub fn op(
        mut self,
        field: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<CriteriaValue>,
    ) -> Self {
        let field = field.into();
        let operator = (operator.into(), value.into());
        let existing = self.entries.iter_mut().find_map(|(name, value)| match value {
            CriteriaValue::Operators(ops) if *name == field => Some(ops),
            _ => None,
        });
        match existing {
            Some(ops) => ops.push(operator),
            None => self
                .entries
                .push((field, CriteriaValue::Operators(vec![operator]))),
        }
        self
    }

    /// Add an `$or` group made of the given branches
    pub fn or(self, branches: Vec<Criteria>) -> Self {
        self.entry(OR_KEY, CriteriaValue::Branches(branches))
    }

    pub fn entries(&self) -> &[(String, CriteriaValue)] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<(String, CriteriaValue)> {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse criteria from a JSON object, keeping key order
    pub fn from_json(json: &serde_json::Value) -> Result<Self> {
        let object = json
            .as_object()
            .ok_or_else(|| QueryError::InvalidFilter("criteria must be a JSON object".into()))?;

        let mut criteria = Criteria::new();
        for (key, value) in object {
            let value = if key == OR_KEY {
                let branches = value.as_array().ok_or_else(|| {
                    QueryError::InvalidFilter(format!("'{}' expects an array of objects", OR_KEY))
                })?;
                CriteriaValue::Branches(
                    branches
                        .iter()
                        .map(Criteria::from_json)
                        .collect::<Result<Vec<_>>>()?,
                )
            } else {
                json_to_criteria_value(key, value)?
            };
            criteria = criteria.entry(key.clone(), value);
        }
        Ok(criteria)
    }

    /// Resolve operator keys into conditions and OR groups
    pub fn resolve(self) -> Result<ResolvedCriteria> {
        let mut resolved = ResolvedCriteria::default();
        for (field, value) in self.entries {
            if field == OR_KEY {
                resolved.or_groups.push(resolve_or_group(value)?);
            } else if field.starts_with('$') {
                return Err(QueryError::InvalidFilter(format!(
                    "unsupported top-level key '{}'",
                    field
                )));
            } else {
                resolve_field(&field, value, &mut resolved.conditions)?;
            }
        }
        Ok(resolved)
    }
}

impl TryFrom<serde_json::Value> for Criteria {
    type Error = QueryError;

    fn try_from(json: serde_json::Value) -> Result<Self> {
        Criteria::from_json(&json)
    }
}

fn json_to_criteria_value(field: &str, json: &serde_json::Value) -> Result<CriteriaValue> {
    match json {
        serde_json::Value::Array(items) => Ok(CriteriaValue::List(json_list(field, items)?)),
        serde_json::Value::Object(ops) => {
            let ops = ops
                .iter()
                .map(|(key, value)| Ok((key.clone(), json_to_criteria_value(field, value)?)))
                .collect::<Result<Vec<_>>>()?;
            Ok(CriteriaValue::Operators(ops))
        }
        scalar => Value::from_json(scalar)
            .map(CriteriaValue::Scalar)
            .ok_or_else(|| QueryError::InvalidFilter(format!("bad value for '{}'", field))),
    }
}

fn json_list(field: &str, items: &[serde_json::Value]) -> Result<Vec<Value>> {
    items
        .iter()
        .map(|item| {
            Value::from_json(item).ok_or_else(|| {
                QueryError::InvalidFilter(format!("list for '{}' must contain scalars", field))
            })
        })
        .collect()
}

fn resolve_field(field: &str, value: CriteriaValue, out: &mut Vec<Condition>) -> Result<()> {
    match value {
        CriteriaValue::Scalar(v) => out.push(Condition::new(field, FilterValue::Equality(v))),
        CriteriaValue::List(vs) => out.push(Condition::new(field, FilterValue::InSet(vs))),
        CriteriaValue::Operators(ops) => {
            for (key, operand) in ops {
                out.push(resolve_operator(field, &key, operand)?);
            }
        }
        CriteriaValue::Branches(_) => {
            return Err(QueryError::InvalidFilter(format!(
                "branches are only allowed under '{}', found on '{}'",
                OR_KEY, field
            )))
        }
    }
    Ok(())
}

fn resolve_operator(field: &str, key: &str, operand: CriteriaValue) -> Result<Condition> {
    if key == IN_KEY {
        let values = match operand {
            CriteriaValue::List(vs) => vs,
            CriteriaValue::Scalar(v) => vec![v],
            _ => {
                return Err(QueryError::InvalidFilter(format!(
                    "'{}' on '{}' expects a list",
                    IN_KEY, field
                )))
            }
        };
        return Ok(Condition::new(field, FilterValue::InSet(values)));
    }

    let op = RangeOp::from_key(key).ok_or_else(|| QueryError::UnknownOperator {
        field: field.to_string(),
        operator: key.to_string(),
    })?;
    match operand {
        CriteriaValue::Scalar(v) => Ok(Condition::new(field, FilterValue::Range(op, v))),
        _ => Err(QueryError::InvalidFilter(format!(
            "'{}' on '{}' expects a scalar",
            key, field
        ))),
    }
}

fn resolve_or_group(value: CriteriaValue) -> Result<OrGroup> {
    let branches = match value {
        CriteriaValue::Branches(branches) if !branches.is_empty() => branches,
        _ => {
            return Err(QueryError::InvalidFilter(format!(
                "'{}' requires at least one branch",
                OR_KEY
            )))
        }
    };

    let mut conditions = Vec::new();
    for branch in branches {
        for (field, value) in branch.entries {
            if field.starts_with('$') {
                return Err(QueryError::InvalidFilter(format!(
                    "'{}' is not allowed inside '{}'",
                    field, OR_KEY
                )));
            }
            resolve_field(&field, value, &mut conditions)?;
        }
    }
    Ok(OrGroup::new(conditions))
}
