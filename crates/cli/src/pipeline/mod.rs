//! Control-loop orchestration.

mod control_loop;
mod protocol;
mod scheduler;
mod stats;
mod teardown;

pub use control_loop::{ControlLoop, LoopContext, LoopExit, LoopLimits};
pub use protocol::verify_protocol;
pub use scheduler::TokioScheduler;
pub use stats::LoopStats;
pub use teardown::TeardownGuard;
