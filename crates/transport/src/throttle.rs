//! Rate limiter for repetitive error logs

use std::time::Duration;

use contracts::Clock;

/// Allows one event per `interval`
#[derive(Debug)]
pub struct ErrorThrottle<C: Clock> {
    clock: C,
    interval: Duration,
    last: Option<Duration>,
}

impl<C: Clock> ErrorThrottle<C> {
    pub fn new(clock: C, interval: Duration) -> Self {
        Self {
            clock,
            interval,
            last: None,
        }
    }

    /// `true` if the caller should log now
    pub fn allow(&mut self) -> bool {
        let now = self.clock.now();
        match self.last {
            Some(last) if now.saturating_sub(last) < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}
