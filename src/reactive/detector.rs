//! Cheap change detection for a filtered row set.

use crate::builder::QueryBuilder;
use crate::error::Result;
use crate::query::compile_fingerprint;
use crate::value::Value;

/// Comparable fingerprint of a filtered set at one poll tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSnapshot {
    pub row_count: i64,
    pub max_row_id: i64,
    pub revision_token: String,
}

impl PollSnapshot {
    /// Read the revision token and run the fingerprint query for a builder
    pub fn capture(query: &QueryBuilder) -> Result<Self> {
        let context = query.context();
        let revision_token = context.revision();

        let compiled = compile_fingerprint(
            query.table_name(),
            query.query_object(),
            &context.config.id_column,
        );
        let row = context
            .executor
            .execute_one(&compiled.sql, &compiled.params, true)?;

        let read = |column: &str| {
            row.as_ref()
                .and_then(|row| row.get(column))
                .and_then(Value::as_i64)
                .unwrap_or(0)
        };
        Ok(Self {
            row_count: read("row_count"),
            max_row_id: read("max_id"),
            revision_token,
        })
    }
}

/// Last-seen snapshot of one subscription
#[derive(Debug, Default)]
pub struct ChangeDetector {
    last: Option<PollSnapshot>,
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the snapshot differs from the last recorded one.
    ///
    /// Nothing recorded yet counts as a change.
    pub fn has_changed(&self, snapshot: &PollSnapshot) -> bool {
        self.last.as_ref() != Some(snapshot)
    }

    pub fn record(&mut self, snapshot: PollSnapshot) {
        self.last = Some(snapshot);
    }

    pub fn last(&self) -> Option<&PollSnapshot> {
        self.last.as_ref()
    }
}
