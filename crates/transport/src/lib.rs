//! # Transport
//!
//! Correction output: encodes controller decisions into fixed-size
//! packets and ships them to a consumer.
//!
//! ## Components
//!
//! - [`UdpSink`]: one datagram per correction
//! - [`LogSink`]: logs packets (dry runs)
//! - [`TelemetryTransport`]: best-effort send policy with edge-triggered release
//! - [`ErrorThrottle`]: rate limit for repeated failure logs

mod error;
mod metrics;
mod sinks;
mod telemetry;
mod throttle;

pub use error::TransportError;
pub use metrics::{MetricsSnapshot, TransportMetrics};
pub use sinks::{ConfiguredSink, LogSink, UdpSink};
pub use telemetry::{Delivery, TelemetryTransport};
pub use throttle::ErrorThrottle;

/// Result type alias
pub type Result<T> = std::result::Result<T, TransportError>;
