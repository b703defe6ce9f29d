//! Render backends.
//!
//! A backend consumes a [`DrawList`](crate::scene::DrawList) and produces a
//! fresh output [`Texture`](crate::device::Texture) per pass.
//!
//! Convention:
//! - geometry is in output pixels (top-left origin, +Y down)
//! - colors are premultiplied; blending is source-over

mod backend;
mod gpu;
mod software;

pub use backend::{create_backend, RenderBackend, RenderPass};
pub use gpu::WgpuBackend;
pub use software::SoftwareBackend;
