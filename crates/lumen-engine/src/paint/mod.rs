//! Paint model shared by the scene compiler and the backends.
//!
//! Colors are linear premultiplied RGBA; geometry lives in `coords`.

pub mod color;

pub use color::Color;
