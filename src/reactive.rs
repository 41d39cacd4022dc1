//! Polling-based live queries.
//!
//! Two independent mechanisms sit on top of [`QueryBuilder`]:
//! - snapshot polling (`subscribe`/`watch`) re-delivers the whole result
//!   set when a revision token or a `(count, max id)` fingerprint changes
//! - incremental polling (`for_each_new`/`stream_new`) delivers rows past a
//!   watermark one at a time
//!
//! Each subscription runs as its own Tokio task that sleeps between ticks
//! and owns its detector state, so subscriptions share nothing but the
//! executor.
//!
//! [`QueryBuilder`]: crate::builder::QueryBuilder

pub mod detector;
pub mod incremental;
pub mod snapshot;

pub use detector::{ChangeDetector, PollSnapshot};

use crate::executor::RevisionSource;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Handle to a running subscription.
///
/// Cancellation is cooperative: a tick already in flight finishes, then no
/// further tick is scheduled. Dropping the handle does not cancel.
#[must_use = "a subscription keeps polling until cancel() is called"]
pub struct Subscription {
    cancelled: Arc<AtomicBool>,
    handle: JoinHandle<()>,
    watermark: Option<Arc<AtomicI64>>,
}

impl Subscription {
    pub(crate) fn new(
        cancelled: Arc<AtomicBool>,
        handle: JoinHandle<()>,
        watermark: Option<Arc<AtomicI64>>,
    ) -> Self {
        Self {
            cancelled,
            handle,
            watermark,
        }
    }

    /// Stop scheduling further ticks
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Whether the polling task has exited
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Last delivered row id, for incremental subscriptions
    pub fn watermark(&self) -> Option<i64> {
        self.watermark
            .as_ref()
            .map(|watermark| watermark.load(Ordering::Acquire))
    }

    /// Wait for the polling task to exit. Only returns after `cancel`.
    pub async fn join(self) {
        if let Err(e) = self.handle.await {
            log::warn!("subscription task ended abnormally: {}", e);
        }
    }
}

/// In-process revision counter to bump after every write
#[derive(Debug, Default)]
pub struct RevisionCounter {
    value: AtomicU64,
}

impl RevisionCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a write, returning the new revision
    pub fn bump(&self) -> u64 {
        self.value.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn current(&self) -> u64 {
        self.value.load(Ordering::Acquire)
    }
}

impl RevisionSource for RevisionCounter {
    fn revision(&self) -> String {
        self.current().to_string()
    }
}
