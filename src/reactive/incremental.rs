//! Incremental polling: deliver each new row once, in id order.

use crate::builder::QueryBuilder;
use crate::error::Result;
use crate::query::{compile_incremental, WATERMARK_ALIAS};
use crate::reactive::detector::{ChangeDetector, PollSnapshot};
use crate::reactive::Subscription;
use crate::row::Row;
use crate::value::Value;
use log::{debug, trace};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct IncrementalPoller<F> {
    query: QueryBuilder,
    detector: ChangeDetector,
    watermark: Arc<AtomicI64>,
    on_row: F,
}

impl<F, Fut> IncrementalPoller<F>
where
    F: FnMut(Row) -> Fut,
    Fut: Future<Output = anyhow::Result<()>>,
{
    async fn run_tick(&mut self) {
        if let Err(e) = self.tick().await {
            debug!(
                "incremental tick on {} failed at watermark {}: {:#}",
                self.query.table_name(),
                self.watermark.load(Ordering::Acquire),
                e
            );
        }
    }

    async fn tick(&mut self) -> anyhow::Result<()> {
        let snapshot = PollSnapshot::capture(&self.query)?;
        if !self.detector.has_changed(&snapshot) {
            trace!("no change on {}", self.query.table_name());
            return Ok(());
        }

        let context = self.query.context();
        let id_column = context.config.id_column.clone();
        let compiled = compile_incremental(
            self.query.table_name(),
            self.query.query_object(),
            &id_column,
            self.watermark.load(Ordering::Acquire),
        );
        let mut rows = context.executor.execute(
            &compiled.sql,
            &compiled.params,
            self.query.query_object().raw_mode,
        )?;
        self.query.load_related(&mut rows)?;

        for mut row in rows {
            let id = row
                .remove(WATERMARK_ALIAS)
                .as_ref()
                .and_then(Value::as_i64)
                .or_else(|| row.id(&id_column));
            (self.on_row)(row).await?;
            // Advance per row so a failed delivery resumes right after the
            // last one that succeeded
            if let Some(id) = id {
                self.watermark.fetch_max(id, Ordering::AcqRel);
            }
        }
        self.detector.record(snapshot);
        Ok(())
    }
}

impl QueryBuilder {
    /// Call `on_row` once for every row that appears after this call.
    ///
    /// Rows already matching the query are skipped: the watermark starts at
    /// the current maximum id under the query's predicate. New rows are
    /// delivered one at a time in ascending id order and the watermark moves
    /// past each row only once its callback has succeeded.
    ///
    /// The baseline is read synchronously, so a failure to read it is
    /// returned here. Later tick failures are logged and retried.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn for_each_new<F, Fut>(&self, interval: Duration, on_row: F) -> Result<Subscription>
    where
        F: FnMut(Row) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let baseline = PollSnapshot::capture(self)?;
        let watermark = Arc::new(AtomicI64::new(baseline.max_row_id));
        let mut detector = ChangeDetector::new();
        detector.record(baseline);

        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = cancelled.clone();
        let mut poller = IncrementalPoller {
            query: self.clone(),
            detector,
            watermark: watermark.clone(),
            on_row,
        };

        let handle = tokio::spawn(async move {
            while !flag.load(Ordering::Acquire) {
                tokio::time::sleep(interval).await;
                if flag.load(Ordering::Acquire) {
                    break;
                }
                poller.run_tick().await;
            }
            debug!(
                "incremental subscription on {} stopped at watermark {}",
                poller.query.table_name(),
                poller.watermark.load(Ordering::Acquire)
            );
        });

        Ok(Subscription::new(cancelled, handle, Some(watermark)))
    }

    /// [`for_each_new`](Self::for_each_new) with the context's configured interval
    pub fn stream_new<F, Fut>(&self, on_row: F) -> Result<Subscription>
    where
        F: FnMut(Row) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.for_each_new(self.context().config.poll_interval(), on_row)
    }
}
