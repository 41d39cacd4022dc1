//! Fluent query builder.
//!
//! Chain methods consume and return the builder, mutating the query object
//! it carries. Terminal methods borrow it, so the same builder can be run
//! again and will re-execute with its current state.

use crate::error::{QueryError, Result};
use crate::executor::QueryContext;
use crate::expression::{Expression, ExpressionBuilder};
use crate::query::{
    compile, compile_count, CompiledQuery, Criteria, JoinSpec, OrderBy, QueryObject,
    SortDirection,
};
use crate::row::Row;
use log::{debug, warn};

/// What a join points at
#[derive(Debug, Clone, PartialEq)]
pub enum JoinTarget {
    /// A related table whose keys are discovered through the join resolver
    Related(String),
    /// An explicit `base.from_column = table.to_column` join
    Explicit {
        table: String,
        from_column: String,
        to_column: String,
    },
}

impl JoinTarget {
    pub fn on(
        table: impl Into<String>,
        from_column: impl Into<String>,
        to_column: impl Into<String>,
    ) -> Self {
        JoinTarget::Explicit {
            table: table.into(),
            from_column: from_column.into(),
            to_column: to_column.into(),
        }
    }
}

impl From<&str> for JoinTarget {
    fn from(table: &str) -> Self {
        JoinTarget::Related(table.to_string())
    }
}

impl From<String> for JoinTarget {
    fn from(table: String) -> Self {
        JoinTarget::Related(table)
    }
}

/// Stateful accumulator for one table's query
#[derive(Clone)]
pub struct QueryBuilder {
    table: String,
    context: QueryContext,
    iqo: QueryObject,
}

impl std::fmt::Debug for QueryBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("table", &self.table)
            .field("iqo", &self.iqo)
            .finish_non_exhaustive()
    }
}

impl QueryBuilder {
    pub fn new(context: QueryContext, table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            context,
            iqo: QueryObject::new(),
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    pub fn context(&self) -> &QueryContext {
        &self.context
    }

    pub fn query_object(&self) -> &QueryObject {
        &self.iqo
    }

    /// Add columns to the projection. Repeated calls accumulate.
    pub fn select_columns<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.iqo
            .selected_columns
            .extend(columns.into_iter().map(Into::into));
        self
    }

    /// Add an object-style filter.
    ///
    /// Operator keys are resolved here, so an unknown one is an error from
    /// this call.
    pub fn filter(mut self, criteria: Criteria) -> Result<Self> {
        let criteria = match &self.context.condition_resolver {
            Some(resolver) => resolver.resolve_conditions(&self.table, criteria),
            None => criteria,
        };
        let resolved = criteria.resolve()?;
        self.iqo.conditions.extend(resolved.conditions);
        self.iqo.or_groups.extend(resolved.or_groups);
        self.warn_if_conditions_shadowed();
        Ok(self)
    }

    /// Add an object-style filter given as a JSON object
    pub fn filter_json(self, json: serde_json::Value) -> Result<Self> {
        let criteria = Criteria::from_json(&json)?;
        self.filter(criteria)
    }

    /// Add a tree filter built from column and function handles.
    ///
    /// Multiple tree filters are ANDed together.
    pub fn filter_with<F>(self, build: F) -> Self
    where
        F: FnOnce(&ExpressionBuilder) -> Expression,
    {
        let expr = build(&ExpressionBuilder::new());
        self.filter_expr(expr)
    }

    /// Add an already-built tree filter
    pub fn filter_expr(mut self, expr: Expression) -> Self {
        self.iqo.and_expression(expr);
        self.warn_if_conditions_shadowed();
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.iqo.ordering.push(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    pub fn limit(mut self, n: u64) -> Self {
        self.iqo.limit = Some(n);
        self
    }

    pub fn offset(mut self, n: u64) -> Self {
        self.iqo.offset = Some(n);
        self
    }

    /// Inner-join another table, projecting the given columns (all when empty).
    ///
    /// Rows from a joined query come back in raw mode.
    pub fn join<S: Into<String>>(
        mut self,
        target: impl Into<JoinTarget>,
        columns: impl IntoIterator<Item = S>,
    ) -> Result<Self> {
        let spec = match target.into() {
            JoinTarget::Related(table) => {
                let resolver = self
                    .context
                    .join_resolver
                    .as_ref()
                    .ok_or_else(|| QueryError::NoJoinResolver {
                        table: table.clone(),
                    })?;
                let keys = resolver.resolve_join(&self.table, &table).ok_or_else(|| {
                    QueryError::NoRelationship {
                        from: self.table.clone(),
                        to: table.clone(),
                    }
                })?;
                JoinSpec::new(table, keys.foreign_key, keys.primary_key)
            }
            JoinTarget::Explicit {
                table,
                from_column,
                to_column,
            } => JoinSpec::new(table, from_column, to_column),
        };
        self.iqo.joins.push(spec.with_columns(columns));
        self.iqo.raw_mode = true;
        Ok(self)
    }

    /// Return flattened rows rather than the table's declared shape
    pub fn raw(mut self) -> Self {
        self.iqo.raw_mode = true;
        self
    }

    /// Load the named relations for all fetched rows in one batch per relation
    pub fn with_related<S: Into<String>>(
        mut self,
        relations: impl IntoIterator<Item = S>,
    ) -> Result<Self> {
        let relations: Vec<String> = relations.into_iter().map(Into::into).collect();
        if self.context.related_loader.is_none() {
            if let Some(relation) = relations.into_iter().next() {
                return Err(QueryError::NoRelatedLoader { relation });
            }
            return Ok(self);
        }
        self.iqo.eager_relations.extend(relations);
        Ok(self)
    }

    /// Compile the current state without executing it
    pub fn to_sql(&self) -> CompiledQuery {
        compile(&self.table, &self.iqo)
    }

    /// Compile the `COUNT(*)` variant without executing it
    pub fn to_count_sql(&self) -> CompiledQuery {
        compile_count(&self.table, &self.iqo)
    }

    pub fn fetch_all(&self) -> Result<Vec<Row>> {
        let compiled = self.to_sql();
        debug!("fetch_all on {}: {} {:?}", self.table, compiled.sql, compiled.params);
        let mut rows =
            self.context
                .executor
                .execute(&compiled.sql, &compiled.params, self.iqo.raw_mode)?;
        self.load_related(&mut rows)?;
        Ok(rows)
    }

    /// Fetch at most one row. Any limit set on the chain is replaced by 1.
    pub fn fetch_one(&self) -> Result<Option<Row>> {
        let compiled = self.to_single_row_sql();
        debug!("fetch_one on {}: {} {:?}", self.table, compiled.sql, compiled.params);
        let row =
            self.context
                .executor
                .execute_one(&compiled.sql, &compiled.params, self.iqo.raw_mode)?;
        match row {
            Some(row) => {
                let mut rows = vec![row];
                self.load_related(&mut rows)?;
                Ok(rows.pop())
            }
            None => Ok(None),
        }
    }

    /// Count rows matching the predicate, ignoring ordering, paging and joins
    pub fn count(&self) -> Result<i64> {
        let compiled = self.to_count_sql();
        debug!("count on {}: {} {:?}", self.table, compiled.sql, compiled.params);
        let row = self
            .context
            .executor
            .execute_one(&compiled.sql, &compiled.params, true)?;
        Ok(row
            .and_then(|row| row.get("count").and_then(|value| value.as_i64()))
            .unwrap_or(0))
    }

    /// Compile the statement `fetch_one` runs
    pub fn to_single_row_sql(&self) -> CompiledQuery {
        let mut iqo = self.iqo.clone();
        iqo.limit = Some(1);
        compile(&self.table, &iqo)
    }

    pub(crate) fn load_related(&self, rows: &mut [Row]) -> Result<()> {
        if self.iqo.eager_relations.is_empty() || rows.is_empty() {
            return Ok(());
        }
        let loader = match &self.context.related_loader {
            Some(loader) => loader,
            None => {
                return Err(QueryError::NoRelatedLoader {
                    relation: self.iqo.eager_relations[0].clone(),
                })
            }
        };

        let id_column = &self.context.config.id_column;
        let mut parent_ids: Vec<i64> = rows.iter().filter_map(|row| row.id(id_column)).collect();
        parent_ids.sort_unstable();
        parent_ids.dedup();

        for relation in &self.iqo.eager_relations {
            let related = loader.load_related(&self.table, relation, &parent_ids)?;
            debug!(
                "loaded {} '{}' groups for {} parents of {}",
                related.rows_by_parent.len(),
                relation,
                parent_ids.len(),
                self.table
            );
            for row in rows.iter_mut() {
                let children = row
                    .id(id_column)
                    .and_then(|id| related.rows_by_parent.get(&id))
                    .cloned()
                    .unwrap_or_default();
                row.set_related(relation.clone(), children);
            }
        }
        Ok(())
    }

    fn warn_if_conditions_shadowed(&self) {
        if self.iqo.expression_filter.is_some() && !self.iqo.conditions.is_empty() {
            warn!(
                "query on {} has both a tree filter and {} flat condition(s); \
                 the flat conditions are ignored",
                self.table,
                self.iqo.conditions.len()
            );
        }
    }
}
