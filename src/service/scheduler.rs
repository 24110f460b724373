//! Periodic refresh trigger.
//!
//! Runs on a plain OS thread: feed fetching is blocking I/O and must stay out
//! of the async runtime that serves readers.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, error, info};

use crate::error::AppError;
use crate::service::Aggregator;

pub struct Scheduler {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

impl Scheduler {
    /// Refresh immediately, then every `interval` until stopped.
    pub fn start(aggregator: Arc<Aggregator>, interval: Duration) -> Result<Self, AppError> {
        let (stop, stopped) = mpsc::channel::<()>();
        let handle = thread::Builder::new()
            .name("epi-refresh".to_string())
            .spawn(move || {
                info!(interval_secs = interval.as_secs(), "refresh scheduler started");
                loop {
                    // Failures are logged by the aggregator; keep the cadence
                    // even if a refresh panics.
                    if panic::catch_unwind(AssertUnwindSafe(|| aggregator.refresh())).is_err() {
                        error!("refresh panicked; retrying next interval");
                    }
                    match stopped.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => debug!("scheduled refresh"),
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                info!("refresh scheduler stopped");
            })
            .map_err(|e| AppError::new(4, format!("Failed to start refresh thread: {e}")))?;
        Ok(Self { stop, handle })
    }

    /// Stop the loop and wait for an in-flight refresh to finish.
    pub fn stop(self) {
        let _ = self.stop.send(());
        let _ = self.handle.join();
    }
}
