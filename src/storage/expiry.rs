//! Background Expiry Reaper
//!
//! This module implements a background task that periodically removes
//! expired entries from a [`Store`]. This is "active expiry", as opposed to
//! the lazy check every read performs.
//!
//! Lazy expiry alone never reclaims memory for keys that expire and are
//! never written again. The reaper sweeps the whole store once per interval.
//!
//! ## Design
//!
//! The reaper runs as a Tokio task and:
//! 1. Waits for a fixed interval
//! 2. Calls [`Store::delete_expired`]
//! 3. Logs how many entries were removed
//!
//! The shutdown channel is created before the task is spawned, so
//! [`Reaper::stop`] can always be called and never blocks.

use crate::storage::Store;
use std::future::Future;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::runtime::{self, Handle};
use tokio::sync::watch;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

/// A handle to the running reaper.
///
/// When this handle is dropped, the reaper task will be stopped.
#[derive(Debug)]
pub struct Reaper {
    /// Sender to signal shutdown
    shutdown_tx: watch::Sender<bool>,
}

impl Reaper {
    /// Starts the reaper as a background task.
    ///
    /// # Arguments
    ///
    /// * `store` - The store to sweep
    /// * `interval` - Time between sweeps. Zero starts no task at all.
    ///
    /// The task runs on the current Tokio runtime if there is one, and
    /// otherwise on a dedicated thread with its own single-threaded runtime.
    ///
    /// A task spawned on the current runtime lives only as long as that
    /// runtime. If the runtime shuts down first, sweeping ends, a warning is
    /// logged and [`Reaper::is_running`] reports `false`.
    ///
    /// # Example
    ///
    /// ```
    /// use stashkv::{Reaper, Store};
    /// use std::sync::Arc;
    /// use std::time::Duration;
    ///
    /// let store: Arc<Store<String>> = Arc::new(Store::new(Duration::ZERO));
    /// let reaper = Reaper::start(Arc::clone(&store), Duration::from_secs(5));
    ///
    /// // Reaper runs in the background...
    ///
    /// assert!(reaper.stop());
    /// assert!(!reaper.stop());
    /// ```
    pub fn start<V>(store: Arc<Store<V>>, interval: Duration) -> Self
    where
        V: Send + Sync + 'static,
    {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let reaper = Self { shutdown_tx };

        if interval.is_zero() {
            debug!("Sweep interval is zero, reaper disabled");
            reaper.shutdown_tx.send_replace(true);
            return reaper;
        }

        spawn(reaper_loop(store, interval, shutdown_rx));
        info!(interval_ms = interval.as_millis() as u64, "Background reaper started");

        reaper
    }

    /// Stops the reaper.
    ///
    /// This is called automatically when the handle is dropped. Calling it
    /// again is a no-op.
    ///
    /// # Returns
    ///
    /// Returns `true` if this call requested the stop.
    pub fn stop(&self) -> bool {
        let stopped = self.shutdown_tx.send_if_modified(|stopped| {
            if *stopped {
                false
            } else {
                *stopped = true;
                true
            }
        });
        if stopped {
            info!("Background reaper stopped");
        }
        stopped
    }

    /// Returns true while the reaper task is alive and no stop has been
    /// requested.
    pub fn is_running(&self) -> bool {
        // The task owns every receiver, so a closed channel means it is gone.
        !*self.shutdown_tx.borrow() && !self.shutdown_tx.is_closed()
    }
}

impl Drop for Reaper {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Runs the future on the ambient runtime or on a dedicated reaper thread.
fn spawn<F>(future: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(handle) = Handle::try_current() {
        handle.spawn(future);
        return;
    }

    let spawned = thread::Builder::new()
        .name("stashkv-reaper".to_string())
        .spawn(move || {
            match runtime::Builder::new_current_thread().enable_time().build() {
                Ok(rt) => rt.block_on(future),
                Err(e) => warn!(error = %e, "Failed to build reaper runtime"),
            }
        });

    if let Err(e) = spawned {
        warn!(error = %e, "Failed to spawn reaper thread");
    }
}

/// Warns when the reaper task is dropped without a stop request,
/// e.g. because its runtime shut down.
struct ExitGuard(watch::Receiver<bool>);

impl Drop for ExitGuard {
    fn drop(&mut self) {
        if !*self.0.borrow() {
            warn!("Reaper task ended without a stop request, expired entries will no longer be swept");
        }
    }
}

/// The main reaper loop.
async fn reaper_loop<V>(
    store: Arc<Store<V>>,
    interval: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let _exit = ExitGuard(shutdown_rx.clone());
    let mut ticker = time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        // Wait for the next tick or shutdown signal
        tokio::select! {
            _ = ticker.tick() => {}
            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    debug!("Reaper received shutdown signal");
                    return;
                }
                continue;
            }
        }

        let removed = store.delete_expired();

        if removed > 0 {
            debug!(
                removed = removed,
                keys_remaining = store.count(),
                "Expired entries reaped"
            );
        } else {
            trace!("Reaper sweep found nothing to remove");
        }
    }
}
