use crate::coords::PixelSize;
use crate::device::{BackendError, CurrentGuard, GpuDevice, SyncPoint, Texture};
use crate::paint::Color;
use crate::scene::DrawList;

use super::{SoftwareBackend, WgpuBackend};

/// Inputs of one render pass.
pub struct RenderPass<'a> {
    pub draw_list: &'a mut DrawList,
    /// Texture sampled by `DrawCmd::Frame`; `None` paints those commands
    /// transparent.
    pub frame: Option<&'a Texture>,
    pub size: PixelSize,
    pub clear: Color,
}

/// A renderer that turns a draw list into a new texture.
///
/// Every method takes a [`CurrentGuard`]: backends never touch the device
/// unless the owning context is current on the calling thread.
pub trait RenderBackend: Send {
    fn name(&self) -> &'static str;

    /// Records and submits one pass into a newly allocated texture.
    ///
    /// Returns once the work is submitted, not when the GPU finished it;
    /// use [`sync_point`](Self::sync_point) for that.
    fn render(&mut self, cx: &CurrentGuard, pass: RenderPass<'_>) -> Result<Texture, BackendError>;

    /// Fence covering every pass submitted so far.
    fn sync_point(&mut self, cx: &CurrentGuard) -> SyncPoint;
}

/// Creates the backend matching the context's device.
pub fn create_backend(cx: &CurrentGuard) -> Result<Box<dyn RenderBackend>, BackendError> {
    match cx.device() {
        GpuDevice::Software(_) => Ok(Box::new(SoftwareBackend::new(cx))),
        GpuDevice::Wgpu(dev) => Ok(Box::new(WgpuBackend::new(cx, dev)?)),
    }
}
