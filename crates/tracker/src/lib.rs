//! # Tracker
//!
//! 目标跟踪与控制模块。
//!
//! Responsibilities:
//! - Select the tracked point from detections ([`TargetSelector`])
//! - Filter and predict its motion ([`MotionEstimator`], constant-velocity Kalman)
//! - Turn the predicted error into a bounded integer correction ([`AimController`])
//! - In-process variant: capture / vision / actuation threads joined by
//!   single-slot handoffs ([`ThreadedPipeline`])
//!
//! ## Usage
//!
//! ```ignore
//! use tracker::Tracker;
//!
//! let mut tracker = Tracker::from_blueprint(&blueprint)?;
//! let correction = tracker.step(&detections, frame.width, frame.height);
//! ```

mod accumulator;
mod controller;
mod handoff;
mod kalman;
mod selector;
mod threaded;
mod tracking;

pub use accumulator::Accumulator;
pub use controller::{AimController, ControlParams};
pub use handoff::{CorrectionMailbox, LatestCell};
pub use kalman::{Estimate, MotionEstimator};
pub use selector::TargetSelector;
pub use threaded::{
    Actuator, FrameSource, InputEvent, MoveCommand, ThreadedConfig, ThreadedPipeline,
};
pub use tracking::Tracker;
