//! Background eviction of expired reservations.
//!
//! Reads already ignore expired entries, so the sweeper only bounds memory:
//! it periodically calls [`ReservationStore::evict_expired`]. The first pass
//! runs one interval after start. Intervals are clamped to
//! `1ms..=`[`MAX_SWEEP_INTERVAL`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::MAX_SWEEP_INTERVAL;
use crate::reservation_store::ReservationStore;

const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy)]
pub struct ExpirySweeper {
    interval: Duration,
}

impl ExpirySweeper {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.clamp(MIN_SWEEP_INTERVAL, MAX_SWEEP_INTERVAL),
        }
    }

    /// Spawn the sweep loop on the current tokio runtime.
    pub fn spawn<S>(self, store: Arc<S>) -> ExpirySweeperHandle
    where
        S: ReservationStore + ?Sized + 'static,
    {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let interval = self.interval;

        let task = tokio::spawn(async move {
            let now = tokio::time::Instant::now();
            let first = now.checked_add(interval).unwrap_or(now);
            let mut ticker = tokio::time::interval_at(first, interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match store.evict_expired().await {
                            Ok(0) => {}
                            Ok(evicted) => debug!(evicted, "evicted expired reservations"),
                            Err(err) => warn!(error = %err, "expiry sweep failed"),
                        }
                    }
                    changed = shutdown_rx.changed() => {
                        // A closed channel means the handle is gone.
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            debug!("expiry sweeper stopped");
        });

        ExpirySweeperHandle {
            shutdown: shutdown_tx,
            task: Some(task),
        }
    }
}

/// Owner of a running sweep loop. Dropping it stops the loop.
#[derive(Debug)]
pub struct ExpirySweeperHandle {
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl ExpirySweeperHandle {
    /// Signal the loop to stop and wait for it to finish.
    pub async fn shutdown(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(|t| t.is_finished())
    }
}

impl Drop for ExpirySweeperHandle {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}
