//! Frame read status
//!
//! Every non-`Ok` status is transient: the loop counts it, sleeps one poll
//! interval and tries again.

use serde::{Deserialize, Serialize};

use crate::Frame;

/// Result classification of one `read_latest` poll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadStatus {
    /// A new, consistent frame was delivered
    Ok,
    /// Backing region not created (or not sized) yet
    MappingUnavailable,
    /// Producer mid-write, or payload torn by a concurrent write
    SequenceUnstable,
    /// No frame newer than the last delivered one
    FrameUnchanged,
    /// Header failed identity or geometry validation
    HeaderInvalid,
}

impl ReadStatus {
    pub const ALL: [ReadStatus; 5] = [
        ReadStatus::Ok,
        ReadStatus::MappingUnavailable,
        ReadStatus::SequenceUnstable,
        ReadStatus::FrameUnchanged,
        ReadStatus::HeaderInvalid,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::MappingUnavailable => "mapping_unavailable",
            Self::SequenceUnstable => "sequence_unstable",
            Self::FrameUnchanged => "frame_unchanged",
            Self::HeaderInvalid => "header_invalid",
        }
    }

    /// Dense index, stable across releases (used by counter arrays)
    #[inline]
    pub fn index(&self) -> usize {
        match self {
            Self::Ok => 0,
            Self::MappingUnavailable => 1,
            Self::SequenceUnstable => 2,
            Self::FrameUnchanged => 3,
            Self::HeaderInvalid => 4,
        }
    }
}

impl std::fmt::Display for ReadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one poll: a fresh frame, or the reason there is none
#[derive(Debug, Clone)]
pub enum ReadOutcome {
    Frame(Frame),
    Idle(ReadStatus),
}

impl ReadOutcome {
    #[inline]
    pub fn status(&self) -> ReadStatus {
        match self {
            Self::Frame(_) => ReadStatus::Ok,
            Self::Idle(status) => *status,
        }
    }

    pub fn into_frame(self) -> Option<Frame> {
        match self {
            Self::Frame(frame) => Some(frame),
            Self::Idle(_) => None,
        }
    }
}
