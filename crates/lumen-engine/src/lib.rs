//! Lumen engine crate.
//!
//! Owns the GPU-facing pieces used by the overlay compositor: context
//! binding, textures and sync points, the draw stream, and the software and
//! wgpu render backends.

pub mod coords;
pub mod device;
pub mod logging;
pub mod paint;
pub mod render;
pub mod scene;
pub mod time;
