//! Frame channel 错误类型

use std::path::PathBuf;

use contracts::ContractError;
use thiserror::Error;

/// Frame channel 错误
#[derive(Debug, Error)]
pub enum FrameChannelError {
    /// 区域文件不存在 (生产者尚未创建)
    #[error("shared region {path:?} does not exist")]
    RegionMissing { path: PathBuf },

    /// 区域大小不足 (生产者尚未完成 resize)
    #[error("shared region {path:?} is {len} bytes, need at least {required}")]
    RegionUndersized {
        path: PathBuf,
        len: usize,
        required: usize,
    },

    /// 载荷超出映射容量
    #[error("payload of {size} bytes exceeds maximum {max}")]
    PayloadTooLarge { size: usize, max: usize },

    /// 载荷长度与 stride × height 不符
    #[error("payload is {actual} bytes, header describes {expected}")]
    PayloadMismatch { expected: usize, actual: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<FrameChannelError> for ContractError {
    fn from(err: FrameChannelError) -> Self {
        match err {
            FrameChannelError::RegionMissing { ref path }
            | FrameChannelError::RegionUndersized { ref path, .. } => {
                ContractError::region_unavailable(path.display().to_string(), err.to_string())
            }
            FrameChannelError::Io(e) => ContractError::Io(e),
            other => ContractError::Other(other.to_string()),
        }
    }
}

/// Frame channel Result 类型别名
pub type Result<T> = std::result::Result<T, FrameChannelError>;
