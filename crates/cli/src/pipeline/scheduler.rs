//! Tokio-backed scheduler for the control loop.

use std::time::{Duration, Instant};

use contracts::Scheduler;

/// Real time: `tokio::time::sleep` and a monotonic origin
#[derive(Debug, Clone, Copy)]
pub struct TokioScheduler {
    origin: Instant,
}

impl TokioScheduler {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for TokioScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for TokioScheduler {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sleep_advances_now() {
        let scheduler = TokioScheduler::new();
        let before = scheduler.now();
        scheduler.sleep(Duration::from_millis(5)).await;
        assert!(scheduler.now() - before >= Duration::from_millis(5));
    }
}
