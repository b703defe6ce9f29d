//! GPU context binding and device-level resources.
//!
//! This module is responsible for:
//! - wrapping a platform device (software or headless wgpu) in a shared
//!   [`ContextBinding`] that is current on at most one thread at a time
//! - tracking live GPU allocations for leak checks
//! - textures, uploads/readbacks, and sync points

mod context;
mod error;
mod gpu;
pub(crate) mod readback;
mod resources;
mod sync;
mod texture;

pub use context::{ContextBinding, CurrentGuard, DeviceKind, GpuDevice, SoftwareDevice};
pub use error::{BackendError, ContextUnavailable, UnavailableReason};
pub use gpu::{GpuInit, WgpuDevice};
pub use resources::{ResourceToken, ResourceTracker};
pub use sync::SyncPoint;
pub use texture::{Texture, TextureId, TextureStorage};
