//! # trackloop CLI library
//!
//! 控制循环的编排层，供 `trackloop` 二进制与端到端测试共用。
//!
//! - [`pipeline`]: 控制循环、调度器、退出清理
//! - [`perception`]: 内置颜色标记检测器与检测后处理
//! - [`overrides`]: 命令行覆盖配置

pub mod error;
pub mod overrides;
pub mod perception;
pub mod pipeline;

pub use error::{CliError, Outcome, EXIT_FAILURE};
