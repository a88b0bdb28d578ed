//! Avatar and video lanes: turn a raw file into an attached, validated media
//! reference. The lanes are independent; each resets only itself on rejection.

mod avatar;
mod file;
mod preview;
mod probe;
pub mod progress;
mod video;

use std::sync::{Mutex, MutexGuard, PoisonError};

pub use avatar::AvatarLane;
pub use file::{FileSource, MediaFile};
pub use preview::{ObjectUrlRegistry, PreviewUrls};
pub use probe::{ProbeError, VideoProbe};
pub use progress::{ProgressCell, ProgressTicker};
pub use video::{VideoLane, VideoLaneState, VideoSelection};

/// Why a lane refused a file.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MediaRejected {
    #[error("invalid file type: expected {expected}/*, got '{found}'")]
    InvalidType { expected: &'static str, found: String },
    #[error("file too large: {size_bytes} bytes exceeds the {limit_mb} MB limit")]
    TooLarge { size_bytes: u64, limit_mb: u64 },
    #[error("video too long: {duration_secs:.1}s exceeds {max_secs:.0}s")]
    TooLong { duration_secs: f64, max_secs: f64 },
    #[error("invalid format: the video could not be decoded")]
    InvalidFormat,
}

impl MediaRejected {
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidType { .. } => "type",
            Self::TooLarge { .. } => "size",
            Self::TooLong { .. } => "duration",
            Self::InvalidFormat => "format",
        }
    }
}

/// Lane-level failure surfaced to the host.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LaneError {
    #[error("the lane is still processing the previous file")]
    Busy,
    #[error(transparent)]
    Rejected(#[from] MediaRejected),
    #[error("no validated video is attached")]
    NotReady,
    #[error("thumbnail {index} is out of range ({available} available)")]
    ThumbnailOutOfRange { index: usize, available: usize },
    #[error("media can only be changed while the ad is being edited")]
    WorkflowLocked,
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
