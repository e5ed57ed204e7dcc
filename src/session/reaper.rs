//! Background eviction of idle sessions.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{info, trace};

use super::SessionStore;

/// Longest cadence the reaper runs at.
pub const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Handle to the periodic sweep task.
///
/// The task sweeps on a fixed cadence that does not drift with sweep
/// duration. It stops when [`Reaper::shutdown`] is called or when this
/// handle is dropped.
#[must_use = "dropping the reaper stops it"]
#[derive(Debug)]
pub struct Reaper {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl Reaper {
    /// Spawn the sweep loop on the current tokio runtime.
    ///
    /// Sessions idle for longer than `max_lifetime` are removed every
    /// `interval`; the first sweep runs one `interval` after spawning.
    /// Intervals above [`MAX_SWEEP_INTERVAL`] are clamped to it.
    ///
    /// # Panics
    ///
    /// Panics if `interval` is zero, or if called outside a tokio runtime.
    pub fn spawn(store: Arc<SessionStore>, max_lifetime: Duration, interval: Duration) -> Self {
        let interval = interval.min(MAX_SWEEP_INTERVAL);
        let (shutdown, mut stop) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            info!(?max_lifetime, ?interval, "session reaper started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let reaped = store.sweep(max_lifetime);
                        if reaped > 0 {
                            info!(reaped, remaining = store.len(), "evicted idle sessions");
                        } else {
                            trace!(remaining = store.len(), "sweep found nothing to evict");
                        }
                    }
                    changed = stop.changed() => {
                        if changed.is_err() || *stop.borrow() {
                            break;
                        }
                    }
                }
            }

            info!("session reaper stopped");
        });

        Self { shutdown, handle }
    }

    /// Stop the sweep loop and wait for it to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.handle.await;
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}
