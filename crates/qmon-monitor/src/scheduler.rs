//! Periodic poll driver.
//!
//! ```text
//!            start(ms)
//!   Idle ───────────────→ Polling ──┐ tick: poll target
//!    ↑                      │  ↑    │ (skipped while the previous
//!    └──────── stop() ──────┘  └────┘  poll is still in flight)
//! ```
//!
//! The scheduler owns its timer task; there is no ambient global handle.
//! Intervals below [`MIN_POLL_INTERVAL_MS`] are raised to it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use qmon_core::{MIN_POLL_INTERVAL_MS, clamp_poll_interval};

/// Something polled on every tick.
#[async_trait]
pub trait PollTarget: Send + Sync + 'static {
    /// Run one poll cycle. Failures are the target's to log.
    async fn poll(&self);
}

/// Scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    /// No timer running.
    Idle,
    /// Timer running at the given effective interval.
    Polling(Duration),
}

/// Clears the in-flight flag when a poll finishes, even by panic.
struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Drives a [`PollTarget`] on a repeating timer.
pub struct PollScheduler {
    target: Arc<dyn PollTarget>,
    timer: Option<(JoinHandle<()>, Duration)>,
    in_flight: Arc<AtomicBool>,
}

impl PollScheduler {
    /// Create an idle scheduler.
    pub fn new(target: Arc<dyn PollTarget>) -> Self {
        Self {
            target,
            timer: None,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start polling every `interval_ms` (at least 5000 ms).
    ///
    /// The first poll happens one full interval from now. Any running timer
    /// is replaced. Must be called from within a Tokio runtime.
    pub fn start(&mut self, interval_ms: u64) -> Duration {
        self.stop();

        let period = clamp_poll_interval(interval_ms);
        if interval_ms < MIN_POLL_INTERVAL_MS {
            tracing::debug!(
                "poll interval {interval_ms} ms raised to {MIN_POLL_INTERVAL_MS} ms"
            );
        }

        let target = Arc::clone(&self.target);
        let in_flight = Arc::clone(&self.in_flight);
        let handle = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if in_flight.swap(true, Ordering::SeqCst) {
                    tracing::debug!("previous poll still running; skipping tick");
                    continue;
                }
                let target = Arc::clone(&target);
                let guard = InFlight(Arc::clone(&in_flight));
                // Detached so that stop() never cancels a request mid-flight.
                tokio::spawn(async move {
                    let _guard = guard;
                    target.poll().await;
                });
            }
        });

        tracing::info!("polling every {} ms", period.as_millis());
        self.timer = Some((handle, period));
        period
    }

    /// Stop polling. Safe to call when already idle.
    ///
    /// A poll already in flight runs to completion.
    pub fn stop(&mut self) {
        if let Some((handle, _)) = self.timer.take() {
            handle.abort();
            tracing::info!("polling stopped");
        }
    }

    /// Stop, then start with a new interval.
    pub fn restart(&mut self, interval_ms: u64) -> Duration {
        self.stop();
        self.start(interval_ms)
    }

    /// Current state.
    pub fn state(&self) -> PollState {
        match &self.timer {
            Some((_, period)) => PollState::Polling(*period),
            None => PollState::Idle,
        }
    }

    /// Whether a timer is running.
    pub fn is_polling(&self) -> bool {
        self.timer.is_some()
    }

    /// Effective interval while polling.
    pub fn effective_interval(&self) -> Option<Duration> {
        self.timer.as_ref().map(|(_, period)| *period)
    }

    /// Whether a poll is running right now.
    pub fn poll_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        if let Some((handle, _)) = self.timer.take() {
            handle.abort();
        }
    }
}
