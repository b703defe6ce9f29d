//! Geometry types shared by the draw stream and the backends.
//!
//! Canonical space:
//! - pixels of the output texture
//! - origin top-left
//! - +X right, +Y down

mod rect;
mod size;
mod vec2;

pub use rect::Rect;
pub use size::PixelSize;
pub use vec2::Vec2;
