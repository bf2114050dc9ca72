//! TTL Cleanup Task
//!
//! Supervised background task that periodically sweeps expired cache entries.
//!
//! The sweep loop runs as a child task. If it panics, the supervisor logs the
//! panic and starts a new child after a backoff delay, so a persistent fault
//! cannot turn into a tight restart loop.

use std::any::Any;
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tokio::runtime::Builder;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, trace};

use crate::error::Result;

/// Shortest interval the sweeper will tick at.
pub const MIN_CLEANUP_INTERVAL: Duration = Duration::from_millis(1);

const RESTART_BACKOFF_MIN: Duration = Duration::from_millis(10);
const RESTART_BACKOFF_MAX: Duration = Duration::from_secs(5);
/// A child that ran at least this long resets the backoff.
const HEALTHY_RUN: Duration = Duration::from_secs(30);

// == Cleanup Task ==
/// Handle to a running sweeper.
///
/// The sweep closure returns `ControlFlow::Continue(removed)` after each pass,
/// or `ControlFlow::Break(())` once there is nothing left to sweep, which ends
/// the task. Stopping is cooperative: the task notices between ticks and
/// never interrupts a pass that has already started.
///
/// Dropping the handle stops the task as well.
#[derive(Debug)]
pub struct CleanupTask {
    stop_tx: watch::Sender<bool>,
    restarts: Arc<AtomicU64>,
    interval: Duration,
}

impl CleanupTask {
    /// Spawns a sweeper that calls `sweep` every `interval`.
    ///
    /// The task always runs on its own thread with a current-thread runtime,
    /// so it keeps sweeping after any runtime the caller happens to be on
    /// shuts down.
    ///
    /// # Example
    /// ```ignore
    /// let task = CleanupTask::spawn(Duration::from_secs(1), move || {
    ///     ControlFlow::Continue(store.write().purge(Instant::now()))
    /// })?;
    /// // Later, during shutdown:
    /// task.stop();
    /// ```
    pub fn spawn<F>(interval: Duration, sweep: F) -> Result<Self>
    where
        F: Fn() -> ControlFlow<(), usize> + Send + Sync + 'static,
    {
        let interval = interval.max(MIN_CLEANUP_INTERVAL);
        let (stop_tx, stop_rx) = watch::channel(false);
        let restarts = Arc::new(AtomicU64::new(0));
        let supervisor = supervise(interval, Arc::new(sweep), stop_rx, restarts.clone());

        thread::Builder::new()
            .name("ttl-lru-cleanup".to_string())
            .spawn(move || match Builder::new_current_thread().enable_time().build() {
                Ok(runtime) => runtime.block_on(supervisor),
                Err(err) => error!("Failed to build TTL cleanup runtime: {}", err),
            })?;

        info!("Starting TTL cleanup task with interval of {:?}", interval);
        Ok(Self {
            stop_tx,
            restarts,
            interval,
        })
    }

    // == Stop ==
    /// Requests the task to stop. Safe to call more than once.
    pub fn stop(&self) {
        let was_stopped = self.stop_tx.send_replace(true);
        if !was_stopped {
            info!("TTL cleanup task stopped");
        }
    }

    /// True until the task is stopped or has exited on its own.
    pub fn is_running(&self) -> bool {
        !*self.stop_tx.borrow() && !self.stop_tx.is_closed()
    }

    /// Number of times the sweep loop was restarted after a panic.
    pub fn restarts(&self) -> u64 {
        self.restarts.load(Ordering::Relaxed)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

async fn supervise<F>(
    interval: Duration,
    sweep: Arc<F>,
    mut stop_rx: watch::Receiver<bool>,
    restarts: Arc<AtomicU64>,
) where
    F: Fn() -> ControlFlow<(), usize> + Send + Sync + 'static,
{
    let mut backoff = RESTART_BACKOFF_MIN;

    loop {
        let started = Instant::now();
        let worker = tokio::spawn(run_sweeps(interval, sweep.clone(), stop_rx.clone()));

        let message = match worker.await {
            Ok(()) => break,
            Err(err) if err.is_panic() => panic_message(err.into_panic()),
            // Cancelled by runtime shutdown
            Err(_) => break,
        };

        if started.elapsed() >= HEALTHY_RUN {
            backoff = RESTART_BACKOFF_MIN;
        }
        let restart = restarts.fetch_add(1, Ordering::Relaxed) + 1;
        error!(
            restart,
            ?backoff,
            "TTL cleanup task panicked: {}; restarting",
            message
        );

        tokio::select! {
            _ = tokio::time::sleep(backoff) => {}
            _ = stopped(&mut stop_rx) => break,
        }
        backoff = (backoff * 2).min(RESTART_BACKOFF_MAX);
    }

    debug!("TTL cleanup task exited");
}

async fn run_sweeps<F>(interval: Duration, sweep: Arc<F>, mut stop_rx: watch::Receiver<bool>)
where
    F: Fn() -> ControlFlow<(), usize> + Send + Sync + 'static,
{
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => match sweep() {
                ControlFlow::Continue(0) => trace!("TTL cleanup: no expired entries found"),
                ControlFlow::Continue(removed) => {
                    debug!("TTL cleanup: removed {} expired entries", removed)
                }
                ControlFlow::Break(()) => {
                    debug!("TTL cleanup: cache is gone");
                    return;
                }
            },
            _ = stopped(&mut stop_rx) => return,
        }
    }
}

/// Resolves once a stop is requested or the owning handle is dropped.
async fn stopped(stop_rx: &mut watch::Receiver<bool>) {
    let _ = stop_rx.wait_for(|stop| *stop).await;
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
