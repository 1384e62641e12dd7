//! # Frame Channel
//!
//! 共享内存帧通道。
//!
//! Responsibilities:
//! - Map the producer's region read-only (it may not exist yet)
//! - Seqlock read with torn-read detection, never blocking the producer
//! - Validate the 48-byte header and de-stride the payload into a [`Frame`]
//! - Producer side: [`FrameWriter`] and a synthetic [`MockProducer`]
//!
//! ## Usage
//!
//! ```ignore
//! use frame_channel::FrameChannel;
//!
//! let mut channel = FrameChannel::open(&blueprint.region);
//! loop {
//!     match channel.read_latest() {
//!         ReadOutcome::Frame(frame) => process(frame),
//!         ReadOutcome::Idle(status) => sleep(poll_interval),
//!     }
//! }
//! ```
//!
//! [`Frame`]: contracts::Frame

mod error;
mod mock;
mod reader;
mod region;
mod writer;

pub use error::{FrameChannelError, Result};
pub use mock::{render_figure, FigureStyle, MockProducer, MockProducerConfig};
pub use reader::FrameChannel;
pub use region::{FileRegionSource, MappedRegion, RegionSource, SharedRegion};
pub use writer::FrameWriter;
