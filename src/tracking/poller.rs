//! Fixed interval poll driver
//!
//! Ticks never overlap: when a tick is due while the previous one is still
//! running it is skipped, not queued. Stopping lets an in-flight tick run to
//! completion but its [`Liveness`] reports the stop so the result can be
//! dropped instead of committed.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Default interval between polls (30 seconds).
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 30_000;

/// Captured at tick start, tells whether the owner is still alive
#[derive(Debug, Clone)]
pub struct Liveness(CancellationToken);

impl Liveness {
    pub fn new(token: CancellationToken) -> Self {
        Self(token)
    }

    pub fn is_alive(&self) -> bool {
        !self.0.is_cancelled()
    }
}

/// Shared "a tick is running" flag
#[derive(Debug, Clone, Default)]
pub struct TickGuard {
    busy: Arc<AtomicBool>,
}

impl TickGuard {
    /// Claim the tick slot, `None` when another tick holds it
    pub fn try_enter(&self) -> Option<InFlight> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight {
                busy: Arc::clone(&self.busy),
            })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Releases the tick slot on drop
#[derive(Debug)]
pub struct InFlight {
    busy: Arc<AtomicBool>,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

pub struct Poller {
    interval: Duration,
    guard: TickGuard,
    /// Cancelling it stops every poll started from this poller
    root: CancellationToken,
    running: Option<(CancellationToken, JoinHandle<()>)>,
}

impl Poller {
    pub fn new(interval: Duration) -> Self {
        Self::child_of(interval, &CancellationToken::new())
    }

    /// Poller stopped as well when `parent` is cancelled
    pub fn child_of(interval: Duration, parent: &CancellationToken) -> Self {
        Self {
            interval,
            guard: TickGuard::default(),
            root: parent.clone(),
            running: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Guard shared with ticks triggered outside the timer
    pub fn guard(&self) -> TickGuard {
        self.guard.clone()
    }

    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .map_or(false, |(token, _)| !token.is_cancelled())
    }

    /// Invoke `on_tick` every interval until [`Poller::stop`].
    ///
    /// The first call happens one interval after start. Must be called from
    /// within a tokio runtime. Restarting a running poller stops it first.
    pub fn start<F, Fut>(&mut self, on_tick: F)
    where
        F: Fn(Liveness) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.stop();

        let shutdown = self.root.child_token();
        let guard = self.guard.clone();
        let period = self.interval;

        let task_shutdown = shutdown.clone();
        let handle = tokio::spawn(async move {
            info!(interval_ms = period.as_millis() as u64, "Poller starting");

            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // Skip the first immediate tick
            interval.tick().await;

            loop {
                tokio::select! {
                    biased;

                    _ = task_shutdown.cancelled() => {
                        info!("Poller stopped");
                        break;
                    }

                    _ = interval.tick() => {
                        match guard.try_enter() {
                            Some(in_flight) => {
                                let work = on_tick(Liveness::new(task_shutdown.clone()));
                                tokio::spawn(async move {
                                    work.await;
                                    drop(in_flight);
                                });
                            }
                            None => debug!("Previous tick still running, skipping this one"),
                        }
                    }
                }
            }
        });

        self.running = Some((shutdown, handle));
    }

    /// Halt future ticks. An in-flight tick finishes but sees itself dead.
    pub fn stop(&mut self) {
        if let Some((shutdown, _handle)) = self.running.take() {
            shutdown.cancel();
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.stop();
    }
}
