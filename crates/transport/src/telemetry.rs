//! TelemetryTransport - best-effort correction output
//!
//! Wraps a [`CorrectionSink`] with the loop's send policy:
//! failures never propagate, failure logs are throttled, and a single
//! release packet marks each loss of target.

use std::sync::Arc;
use std::time::Duration;

use contracts::{Clock, Correction, CorrectionPacket, CorrectionSink, MonotonicClock};
use tracing::{debug, warn};

use crate::metrics::TransportMetrics;
use crate::throttle::ErrorThrottle;

/// What `publish` did with one correction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Target packet sent
    Sent,
    /// Release packet sent on the present -> absent edge
    Released,
    /// Nothing to send (target still absent)
    Skipped,
    /// A packet was attempted and failed
    Failed,
}

pub struct TelemetryTransport<S: CorrectionSink, C: Clock = MonotonicClock> {
    sink: S,
    throttle: ErrorThrottle<C>,
    metrics: Arc<TransportMetrics>,
    target_present: bool,
}

impl<S: CorrectionSink> TelemetryTransport<S, MonotonicClock> {
    pub fn new(sink: S, error_log_interval: Duration) -> Self {
        Self::with_clock(sink, MonotonicClock::new(), error_log_interval)
    }
}

impl<S: CorrectionSink, C: Clock> TelemetryTransport<S, C> {
    pub fn with_clock(sink: S, clock: C, error_log_interval: Duration) -> Self {
        Self {
            sink,
            throttle: ErrorThrottle::new(clock, error_log_interval),
            metrics: Arc::new(TransportMetrics::new()),
            target_present: false,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn metrics(&self) -> Arc<TransportMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Whether the last published correction had a target
    pub fn target_present(&self) -> bool {
        self.target_present
    }

    /// Send one packet; `false` on failure, never an error
    pub async fn send(&mut self, frame_id: u32, has_target: bool, dx: f64, dy: f64) -> bool {
        let packet = CorrectionPacket::new(frame_id, has_target, dx, dy);
        self.send_packet(&packet).await
    }

    async fn send_packet(&mut self, packet: &CorrectionPacket) -> bool {
        let result = self.sink.send(packet).await;
        observability::record_correction_sent(self.sink.name(), result.is_ok());

        match result {
            Ok(()) => {
                self.metrics.inc_sent();
                true
            }
            Err(e) => {
                self.metrics.inc_failed();
                if self.throttle.allow() {
                    warn!(
                        sink = %self.sink.name(),
                        frame_id = packet.frame_id,
                        suppressed = self.metrics.suppressed(),
                        error = %e,
                        "correction send failed"
                    );
                } else {
                    self.metrics.inc_suppressed();
                }
                false
            }
        }
    }

    /// Apply the edge-triggered send policy to one controller output
    ///
    /// Target present: send it. Target just lost: send one release.
    /// Target still absent: send nothing.
    pub async fn publish(&mut self, frame_id: u32, correction: &Correction) -> Delivery {
        let was_present = self.target_present;
        self.target_present = correction.has_target;

        if correction.has_target {
            let packet = CorrectionPacket::from_correction(frame_id, correction);
            return if self.send_packet(&packet).await {
                Delivery::Sent
            } else {
                Delivery::Failed
            };
        }

        if !was_present {
            return Delivery::Skipped;
        }

        debug!(frame_id, "target lost, sending release");
        observability::record_release_packet();
        if self.send_packet(&CorrectionPacket::release(frame_id)).await {
            self.metrics.inc_released();
            Delivery::Released
        } else {
            Delivery::Failed
        }
    }

    /// Forget the edge state (e.g. after a long stall)
    pub fn reset(&mut self) {
        self.target_present = false;
    }

    /// Close the underlying sink; errors are logged
    pub async fn close(&mut self) {
        if let Err(e) = self.sink.close().await {
            warn!(sink = %self.sink.name(), error = %e, "failed to close sink");
        }
    }
}
