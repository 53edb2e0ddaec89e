//! Compaction Scheduler
//!
//! Background thread that runs interval and threshold compactions.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, select, Receiver, Sender, TrySendError};

use crate::error::Result;
use super::{CompactionEvent, CompactionOutcome, Compactor, Trigger};

/// Owns the compaction thread
///
/// The thread exits when `shutdown()` is called or the scheduler is dropped.
pub struct CompactionScheduler {
    /// Dropping this wakes the thread up for exit
    shutdown_tx: Option<Sender<()>>,

    handle: Option<JoinHandle<()>>,
}

impl CompactionScheduler {
    const THREAD_NAME: &'static str = "hive-compaction";

    /// Start the scheduler thread
    ///
    /// - `interval`: tick period, `None` for no timer
    /// - `requests`: threshold requests posted by mutating calls
    /// - `events`: where each run's outcome is reported
    pub fn spawn(
        target: Arc<dyn Compactor>,
        interval: Option<Duration>,
        requests: Receiver<Trigger>,
        events: Sender<CompactionEvent>,
    ) -> Result<Self> {
        let (shutdown_tx, shutdown_rx) = channel::bounded::<()>(0);

        let handle = thread::Builder::new()
            .name(Self::THREAD_NAME.to_string())
            .spawn(move || run_loop(target, interval, requests, shutdown_rx, events))?;

        tracing::debug!(?interval, "compaction scheduler started");

        Ok(Self {
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Stop the thread and wait for it (including a run in progress)
    pub fn shutdown(&mut self) {
        drop(self.shutdown_tx.take());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("compaction scheduler thread panicked");
            } else {
                tracing::debug!("compaction scheduler stopped");
            }
        }
    }
}

impl Drop for CompactionScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_loop(
    target: Arc<dyn Compactor>,
    interval: Option<Duration>,
    requests: Receiver<Trigger>,
    shutdown: Receiver<()>,
    events: Sender<CompactionEvent>,
) {
    let ticker = match interval {
        Some(period) => channel::tick(period),
        None => channel::never(),
    };

    loop {
        select! {
            recv(shutdown) -> _ => break,
            recv(ticker) -> _ => run_once(target.as_ref(), Trigger::Interval, &events),
            recv(requests) -> request => match request {
                Ok(trigger) => run_once(target.as_ref(), trigger, &events),
                Err(_) => break,
            },
        }
    }
}

fn run_once(target: &dyn Compactor, trigger: Trigger, events: &Sender<CompactionEvent>) {
    let result = target.compact();

    match &result {
        Ok(CompactionOutcome::Completed(stats)) => tracing::info!(
            %trigger,
            live_keys = stats.live_keys,
            tombstones_dropped = stats.tombstones_dropped,
            elapsed_ms = stats.duration.as_millis() as u64,
            "background compaction completed"
        ),
        Ok(CompactionOutcome::Skipped) => {
            tracing::debug!(%trigger, "background compaction skipped, another one is running")
        }
        Err(e) => tracing::error!(%trigger, error = %e, "background compaction failed"),
    }

    let event = CompactionEvent {
        trigger,
        result: result.map_err(|e| e.to_string()),
    };
    if let Err(TrySendError::Full(_)) = events.try_send(event) {
        tracing::trace!(%trigger, "compaction event dropped, nobody is draining the channel");
    }
}
