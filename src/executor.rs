//! Collaborators injected into the query layer.
//!
//! The storage engine, relationship metadata, revision tracking and eager
//! loading all live outside this crate. Each is reached through a small
//! trait, and a [`QueryContext`] bundles the implementations one
//! application uses so query builders can be created from it.

use crate::builder::QueryBuilder;
use crate::config::LiveConfig;
use crate::query::Criteria;
use crate::row::Row;
use crate::value::Value;
use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;

/// Synchronous statement execution against the storage engine
pub trait Executor: Send + Sync {
    /// Run a statement and return every row.
    ///
    /// `raw` asks for flattened rows instead of the table's declared shape.
    fn execute(&self, sql: &str, params: &[Value], raw: bool) -> Result<Vec<Row>>;

    /// Run a statement and return its first row, if any
    fn execute_one(&self, sql: &str, params: &[Value], raw: bool) -> Result<Option<Row>> {
        Ok(self.execute(sql, params, raw)?.into_iter().next())
    }
}

/// Key pair joining two tables: `from.foreign_key = to.primary_key`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinKeys {
    pub foreign_key: String,
    pub primary_key: String,
}

/// Relationship metadata lookup
pub trait JoinResolver: Send + Sync {
    fn resolve_join(&self, from_table: &str, to_table: &str) -> Option<JoinKeys>;
}

/// Rewrites entity-reference shorthand in criteria into foreign-key equality
pub trait ConditionResolver: Send + Sync {
    fn resolve_conditions(&self, table: &str, criteria: Criteria) -> Criteria;
}

/// Source of a token that changes on every write visible to this process
pub trait RevisionSource: Send + Sync {
    fn revision(&self) -> String;
}

impl<F> RevisionSource for F
where
    F: Fn() -> String + Send + Sync,
{
    fn revision(&self) -> String {
        self()
    }
}

/// Rows of one relation, grouped by the id of the parent they belong to
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelatedRows {
    /// Column on the related table that points at the parent
    pub key: String,
    pub rows_by_parent: HashMap<i64, Vec<Row>>,
}

/// Batched eager loading of related collections
pub trait RelatedLoader: Send + Sync {
    fn load_related(
        &self,
        parent_table: &str,
        relation: &str,
        parent_ids: &[i64],
    ) -> Result<RelatedRows>;
}

/// Shared collaborators and configuration for building queries
#[derive(Clone)]
pub struct QueryContext {
    pub executor: Arc<dyn Executor>,
    pub join_resolver: Option<Arc<dyn JoinResolver>>,
    pub condition_resolver: Option<Arc<dyn ConditionResolver>>,
    pub revision_source: Option<Arc<dyn RevisionSource>>,
    pub related_loader: Option<Arc<dyn RelatedLoader>>,
    pub config: LiveConfig,
}

impl QueryContext {
    pub fn new(executor: Arc<dyn Executor>) -> Self {
        Self {
            executor,
            join_resolver: None,
            condition_resolver: None,
            revision_source: None,
            related_loader: None,
            config: LiveConfig::default(),
        }
    }

    pub fn with_join_resolver(mut self, resolver: Arc<dyn JoinResolver>) -> Self {
        self.join_resolver = Some(resolver);
        self
    }

    pub fn with_condition_resolver(mut self, resolver: Arc<dyn ConditionResolver>) -> Self {
        self.condition_resolver = Some(resolver);
        self
    }

    pub fn with_revision_source(mut self, source: Arc<dyn RevisionSource>) -> Self {
        self.revision_source = Some(source);
        self
    }

    pub fn with_related_loader(mut self, loader: Arc<dyn RelatedLoader>) -> Self {
        self.related_loader = Some(loader);
        self
    }

    pub fn with_config(mut self, config: LiveConfig) -> Self {
        self.config = config;
        self
    }

    /// Start a query against a table
    pub fn table(&self, name: impl Into<String>) -> QueryBuilder {
        QueryBuilder::new(self.clone(), name)
    }

    /// Current revision token, empty when no source is configured
    pub fn revision(&self) -> String {
        self.revision_source
            .as_ref()
            .map(|source| source.revision())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoRows;

    impl Executor for NoRows {
        fn execute(&self, _sql: &str, _params: &[Value], _raw: bool) -> Result<Vec<Row>> {
            Ok(Vec::new())
        }
    }

    struct TwoRows;

    impl Executor for TwoRows {
        fn execute(&self, _sql: &str, _params: &[Value], _raw: bool) -> Result<Vec<Row>> {
            Ok(vec![Row::new().with("id", 1), Row::new().with("id", 2)])
        }
    }

    #[test]
    fn test_execute_one_defaults_to_first_row() -> Result<()> {
        assert_eq!(NoRows.execute_one("SELECT 1", &[], false)?, None);
        assert_eq!(
            TwoRows.execute_one("SELECT 1", &[], false)?,
            Some(Row::new().with("id", 1))
        );
        Ok(())
    }

    #[test]
    fn test_context_revision() {
        let context = QueryContext::new(Arc::new(NoRows));
        assert_eq!(context.revision(), "");

        let context = context.with_revision_source(Arc::new(|| "rev-7".to_string()));
        assert_eq!(context.revision(), "rev-7");
    }

    #[test]
    fn test_context_table() {
        let context = QueryContext::new(Arc::new(NoRows)).with_config(LiveConfig {
            id_column: "rowid".to_string(),
            ..LiveConfig::default()
        });
        let query = context.table("users");
        assert_eq!(query.table_name(), "users");
        assert_eq!(query.context().config.id_column, "rowid");
    }
}
