use std::fmt;

use thiserror::Error;

use crate::coords::PixelSize;

/// Why [`ContextBinding::make_current`](super::ContextBinding::make_current) failed.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum UnavailableReason {
    /// The platform context was lost or torn down.
    Lost,
    /// Another thread holds the context current.
    CurrentOnOtherThread,
}

impl fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnavailableReason::Lost => f.write_str("context lost"),
            UnavailableReason::CurrentOnOtherThread => f.write_str("current on another thread"),
        }
    }
}

/// The GPU context could not be made current on the calling thread.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("GPU context '{label}' unavailable: {reason}")]
pub struct ContextUnavailable {
    pub label: String,
    pub reason: UnavailableReason,
}

/// Device-side failure while allocating, rendering, or reading back.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("texture size {size} exceeds the device limit of {max} pixels per side")]
    TextureTooLarge { size: PixelSize, max: u32 },

    #[error("texture size {0} has a zero dimension")]
    EmptyTexture(PixelSize),

    #[error("pixel buffer holds {got} bytes, expected {expected}")]
    PixelLength { expected: usize, got: usize },

    #[error("texture {id} is not readable from a {device} device")]
    ForeignTexture { id: u64, device: &'static str },

    #[error("GPU readback failed: {0}")]
    Readback(String),

    #[error("GPU device error: {0}")]
    Device(String),
}

impl BackendError {
    pub(crate) fn check_size(size: PixelSize, max: u32) -> Result<(), BackendError> {
        if size.is_empty() {
            Err(BackendError::EmptyTexture(size))
        } else if size.width > max || size.height > max {
            Err(BackendError::TextureTooLarge { size, max })
        } else {
            Ok(())
        }
    }
}
