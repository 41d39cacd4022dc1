//! Result rows handed back by the executor.

use crate::value::Value;
use serde::Serialize;
use std::collections::BTreeMap;

/// A single result row.
///
/// Columns keep the order the executor produced them in. Related
/// collections attached by eager loading live beside the columns so they
/// never collide with a projected column name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Row {
    columns: Vec<(String, Value)>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    related: BTreeMap<String, Vec<Row>>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style column append
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(column, value);
        self
    }

    /// Set a column, replacing an existing value with the same name
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        let column = column.into();
        let value = value.into();
        match self.columns.iter_mut().find(|(name, _)| *name == column) {
            Some((_, slot)) => *slot = value,
            None => self.columns.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Integer identity of the row under the given id column
    pub fn id(&self, id_column: &str) -> Option<i64> {
        self.get(id_column).and_then(Value::as_i64)
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Take a column out of the row
    pub fn remove(&mut self, column: &str) -> Option<Value> {
        let position = self.columns.iter().position(|(name, _)| name == column)?;
        Some(self.columns.remove(position).1)
    }

    pub fn related(&self, relation: &str) -> Option<&[Row]> {
        self.related.get(relation).map(Vec::as_slice)
    }

    pub fn set_related(&mut self, relation: impl Into<String>, rows: Vec<Row>) {
        self.related.insert(relation.into(), rows);
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (column, value) in iter {
            row.set(column, value);
        }
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let mut row = Row::new().with("id", 1).with("name", "alice");
        assert_eq!(row.len(), 2);
        assert_eq!(row.get("name"), Some(&Value::from("alice")));
        assert_eq!(row.id("id"), Some(1));

        row.set("name", "bob");
        assert_eq!(row.len(), 2);
        assert_eq!(row.get("name"), Some(&Value::from("bob")));
        assert!(row.get("missing").is_none());
    }

    #[test]
    fn test_column_order_preserved() {
        let row: Row = vec![("b", 2), ("a", 1), ("c", 3)].into_iter().collect();
        let names: Vec<&str> = row.columns().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_related() {
        let mut row = Row::new().with("id", 1);
        assert!(row.related("posts").is_none());
        row.set_related("posts", vec![Row::new().with("id", 10)]);
        assert_eq!(row.related("posts").map(<[Row]>::len), Some(1));
    }

    #[test]
    fn test_remove() {
        let mut row = Row::new().with("id", 1).with("name", "alice");
        assert_eq!(row.remove("id"), Some(Value::Integer(1)));
        assert_eq!(row.remove("id"), None);
        let names: Vec<&str> = row.columns().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["name"]);
    }
}
