//! # Contracts
//!
//! Frozen interface contracts (ICD), defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Wire formats
//! - Shared-memory frame header: 48 bytes, little-endian ([`FrameHeader`])
//! - Outbound correction packet: 20 bytes, little-endian ([`CorrectionPacket`])
//!
//! ## Time Model
//! - Producer timestamps are microseconds (`timestamp_us`), opaque to the loop
//! - Loop-side timing goes through [`Clock`] so it can be driven manually in tests

mod blueprint;
mod clock;
mod detection;
mod error;
mod frame;
mod packet;
mod perception;
mod scheduler;
mod sink;
mod status;

pub use blueprint::*;
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use detection::*;
pub use error::*;
pub use frame::*;
pub use packet::*;
pub use perception::PerceptionAdapter;
pub use scheduler::{LocalScheduler, ManualScheduler, Scheduler};
pub use sink::*;
pub use status::{ReadOutcome, ReadStatus};
