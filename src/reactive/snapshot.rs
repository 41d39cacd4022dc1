//! Snapshot polling: re-deliver the full result set whenever it changes.

use crate::builder::QueryBuilder;
use crate::reactive::detector::{ChangeDetector, PollSnapshot};
use crate::reactive::Subscription;
use crate::row::Row;
use log::{debug, trace};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct SnapshotPoller<F> {
    query: QueryBuilder,
    detector: ChangeDetector,
    /// Set while the no-delivery baseline has yet to be read
    needs_baseline: bool,
    on_change: F,
}

impl<F, Fut> SnapshotPoller<F>
where
    F: FnMut(Vec<Row>) -> Fut,
    Fut: Future<Output = anyhow::Result<()>>,
{
    /// Record the current state without delivering anything
    fn prime(&mut self) {
        match PollSnapshot::capture(&self.query) {
            Ok(snapshot) => {
                self.detector.record(snapshot);
                self.needs_baseline = false;
            }
            Err(e) => debug!(
                "initial snapshot of {} failed: {}",
                self.query.table_name(),
                e
            ),
        }
    }

    /// One tick; errors are swallowed so the loop keeps running
    async fn run_tick(&mut self, force: bool) {
        if self.needs_baseline {
            self.prime();
            return;
        }
        if let Err(e) = self.tick(force).await {
            debug!("snapshot tick on {} failed: {:#}", self.query.table_name(), e);
        }
    }

    async fn tick(&mut self, force: bool) -> anyhow::Result<()> {
        let snapshot = PollSnapshot::capture(&self.query)?;
        if !force && !self.detector.has_changed(&snapshot) {
            trace!("no change on {}", self.query.table_name());
            return Ok(());
        }

        let rows = self.query.fetch_all()?;
        debug!(
            "delivering {} row(s) of {} to subscriber",
            rows.len(),
            self.query.table_name()
        );
        (self.on_change)(rows).await?;
        // Recorded only after a successful delivery so a failed one is retried
        self.detector.record(snapshot);
        Ok(())
    }
}

impl QueryBuilder {
    /// Call `on_change` with the full result set whenever it changes.
    ///
    /// A change is a different revision token or a different
    /// `(count, max id)` fingerprint over this query's predicate. Each tick
    /// waits for the callback to finish before the next one is scheduled,
    /// so ticks of one subscription never overlap. Tick failures, including
    /// callback errors, are logged and retried on the next tick.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn subscribe<F, Fut>(
        &self,
        interval: Duration,
        deliver_immediately: bool,
        on_change: F,
    ) -> Subscription
    where
        F: FnMut(Vec<Row>) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = cancelled.clone();
        let mut poller = SnapshotPoller {
            query: self.clone(),
            detector: ChangeDetector::new(),
            needs_baseline: !deliver_immediately,
            on_change,
        };

        let handle = tokio::spawn(async move {
            if deliver_immediately {
                poller.run_tick(true).await;
            } else {
                poller.prime();
            }

            while !flag.load(Ordering::Acquire) {
                tokio::time::sleep(interval).await;
                if flag.load(Ordering::Acquire) {
                    break;
                }
                poller.run_tick(false).await;
            }
            debug!("snapshot subscription on {} stopped", poller.query.table_name());
        });

        Subscription::new(cancelled, handle, None)
    }

    /// [`subscribe`](Self::subscribe) with the context's configured interval
    /// and immediate-delivery setting
    pub fn watch<F, Fut>(&self, on_change: F) -> Subscription
    where
        F: FnMut(Vec<Row>) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let config = &self.context().config;
        self.subscribe(config.poll_interval(), config.deliver_immediately, on_change)
    }
}
