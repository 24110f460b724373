//! Refresh orchestration and the published snapshot slot.
//!
//! [`Aggregator`] owns the only piece of cross-thread state: one atomically
//! swapped `Arc<Snapshot>`. A refresh builds a brand-new snapshot off to the
//! side and publishes it with a single store, so readers see either the old
//! snapshot or the new one, never a partial build. A failed refresh leaves the
//! slot alone.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::aggregate::build_snapshot;
use crate::data::{FeedError, FeedSource};
use crate::domain::{SkipLast, Snapshot};

pub mod scheduler;

pub use scheduler::Scheduler;

/// Last refresh failure, kept for `/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshFailure {
    pub at: DateTime<Utc>,
    pub message: String,
}

/// Counters describing refresh history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshStatus {
    pub ready: bool,
    pub source: String,
    pub attempts: u64,
    pub successes: u64,
    pub failures: u64,
    pub snapshot_timestamp: Option<DateTime<Utc>>,
    pub last_failure: Option<RefreshFailure>,
}

pub struct Aggregator {
    source: Box<dyn FeedSource>,
    skip_last: SkipLast,
    clock: fn() -> DateTime<Utc>,
    current: ArcSwapOption<Snapshot>,
    last_failure: ArcSwapOption<RefreshFailure>,
    attempts: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
}

impl Aggregator {
    pub fn new(source: Box<dyn FeedSource>, skip_last: SkipLast) -> Self {
        Self {
            source,
            skip_last,
            clock: Utc::now,
            current: ArcSwapOption::empty(),
            last_failure: ArcSwapOption::empty(),
            attempts: AtomicU64::new(0),
            successes: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    /// Replace the wall clock used for snapshot timestamps.
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    /// Fetch all feeds, aggregate, and publish.
    ///
    /// A fetch error or an overflowing total aborts the refresh; the
    /// previously published snapshot (if any) stays current.
    pub fn refresh(&self) -> Result<Arc<Snapshot>, FeedError> {
        let timestamp = (self.clock)();
        let start = Instant::now();
        self.attempts.fetch_add(1, Ordering::Relaxed);

        let built = self.source.fetch().and_then(|feeds| {
            let aggregation = build_snapshot(&feeds, &self.skip_last, timestamp)?;
            Ok((feeds.record_count(), aggregation))
        });
        let (rows, aggregation) = match built {
            Ok(built) => built,
            Err(err) => {
                self.record_failure(timestamp, &err);
                return Err(err);
            }
        };

        let snapshot = Arc::new(aggregation.snapshot);
        self.current.store(Some(Arc::clone(&snapshot)));
        self.successes.fetch_add(1, Ordering::Relaxed);

        info!(
            source = %self.source.describe(),
            rows,
            dates = snapshot.dates.len(),
            first = ?snapshot.first_date(),
            last = ?snapshot.last_date(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "snapshot published"
        );
        Ok(snapshot)
    }

    fn record_failure(&self, at: DateTime<Utc>, err: &FeedError) {
        self.failures.fetch_add(1, Ordering::Relaxed);
        self.last_failure.store(Some(Arc::new(RefreshFailure {
            at,
            message: err.to_string(),
        })));
        warn!(
            source = %self.source.describe(),
            error = %err,
            keeping_previous = self.is_ready(),
            "refresh aborted"
        );
    }

    /// True once any snapshot has been published.
    pub fn is_ready(&self) -> bool {
        self.current.load().is_some()
    }

    /// The current snapshot, if one has been published.
    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.current.load_full()
    }

    pub fn skip_last(&self) -> &SkipLast {
        &self.skip_last
    }

    pub fn status(&self) -> RefreshStatus {
        RefreshStatus {
            ready: self.is_ready(),
            source: self.source.describe(),
            attempts: self.attempts.load(Ordering::Relaxed),
            successes: self.successes.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            snapshot_timestamp: self.current.load_full().map(|s| s.timestamp),
            last_failure: self.last_failure.load_full().map(|f| (*f).clone()),
        }
    }
}
