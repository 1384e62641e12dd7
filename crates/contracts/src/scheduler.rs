//! Scheduler - the loop's notion of "now" and "wait"
//!
//! The control loop never calls `tokio::time` directly; it sleeps through
//! a [`Scheduler`] so tests can run the idle path without real time passing.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::{Clock, ManualClock};

/// Clock + sleep
#[trait_variant::make(Scheduler: Send)]
pub trait LocalScheduler {
    /// Current time, from the scheduler's origin
    fn now(&self) -> Duration;

    /// Yield to the runtime for at least `duration`
    async fn sleep(&self, duration: Duration);
}

/// Deterministic scheduler: sleeping advances a [`ManualClock`] instantly
#[derive(Debug, Clone, Default)]
pub struct ManualScheduler {
    clock: ManualClock,
    sleeps: Arc<AtomicU64>,
}

impl ManualScheduler {
    pub fn new(clock: ManualClock) -> Self {
        Self {
            clock,
            sleeps: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn clock(&self) -> &ManualClock {
        &self.clock
    }

    /// Number of `sleep` calls so far
    pub fn sleep_count(&self) -> u64 {
        self.sleeps.load(Ordering::Relaxed)
    }
}

impl Scheduler for ManualScheduler {
    fn now(&self) -> Duration {
        self.clock.now()
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps.fetch_add(1, Ordering::Relaxed);
        self.clock.advance(duration);
    }
}
