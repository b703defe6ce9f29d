//! Draw stream types.
//!
//! Responsibilities:
//! - store backend-agnostic draw commands
//! - provide deterministic ordering (z-index + insertion order)
//! - carry nested clip rects

mod cmd;
mod key;
mod list;

pub use cmd::{Border, DrawCmd, FrameCmd, QuadCmd};
pub use key::{SortKey, ZIndex};
pub use list::{DrawItem, DrawList};
