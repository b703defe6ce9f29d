use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use anyhow::Result;

use crate::coords::PixelSize;

use super::readback;
use super::{
    BackendError, ContextUnavailable, GpuInit, ResourceTracker, Texture, TextureStorage,
    UnavailableReason, WgpuDevice,
};

/// CPU reference device: deterministic, always available.
#[derive(Debug, Clone)]
pub struct SoftwareDevice {
    pub max_texture_dimension: u32,
}

impl Default for SoftwareDevice {
    fn default() -> Self {
        Self { max_texture_dimension: 8192 }
    }
}

/// The platform device behind a [`ContextBinding`].
pub enum GpuDevice {
    Software(SoftwareDevice),
    Wgpu(WgpuDevice),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DeviceKind {
    Software,
    Wgpu,
}

impl GpuDevice {
    pub fn kind(&self) -> DeviceKind {
        match self {
            GpuDevice::Software(_) => DeviceKind::Software,
            GpuDevice::Wgpu(_) => DeviceKind::Wgpu,
        }
    }

    pub fn max_texture_dimension(&self) -> u32 {
        match self {
            GpuDevice::Software(d) => d.max_texture_dimension,
            GpuDevice::Wgpu(d) => d.max_texture_dimension(),
        }
    }
}

/// Shared handle to a GPU context.
///
/// A context is current on at most one thread at a time. All rendering,
/// upload, and readback calls take a [`CurrentGuard`] as proof that the
/// caller made it current; the guard releases currency when dropped, so
/// early returns through `?` cannot leak it. Guards nest on the owning
/// thread.
#[derive(Clone)]
pub struct ContextBinding {
    shared: Arc<Shared>,
}

struct Shared {
    label: String,
    device: GpuDevice,
    currency: Mutex<Currency>,
    lost: AtomicBool,
    tracker: ResourceTracker,
}

#[derive(Default)]
struct Currency {
    owner: Option<ThreadId>,
    depth: usize,
}

impl ContextBinding {
    pub fn new(label: impl Into<String>, device: GpuDevice) -> Self {
        Self {
            shared: Arc::new(Shared {
                label: label.into(),
                device,
                currency: Mutex::new(Currency::default()),
                lost: AtomicBool::new(false),
                tracker: ResourceTracker::new(),
            }),
        }
    }

    /// Context on the CPU reference device with default limits.
    pub fn software() -> Self {
        Self::new("software", GpuDevice::Software(SoftwareDevice::default()))
    }

    /// Context on a headless wgpu device.
    pub fn wgpu(init: GpuInit) -> Result<Self> {
        let device = WgpuDevice::new_headless(init)?;
        Ok(Self::new("wgpu", GpuDevice::Wgpu(device)))
    }

    pub fn label(&self) -> &str {
        &self.shared.label
    }

    pub fn device_kind(&self) -> DeviceKind {
        self.shared.device.kind()
    }

    /// Makes the context current on the calling thread.
    pub fn make_current(&self) -> Result<CurrentGuard, ContextUnavailable> {
        if self.is_lost() {
            return Err(self.unavailable(UnavailableReason::Lost));
        }

        let me = thread::current().id();
        let mut currency = self.lock_currency();
        if currency.owner.is_some_and(|owner| owner != me) {
            return Err(self.unavailable(UnavailableReason::CurrentOnOtherThread));
        }
        currency.owner = Some(me);
        currency.depth += 1;
        if currency.depth == 1 {
            log::trace!("context '{}' made current", self.shared.label);
        }
        drop(currency);

        Ok(CurrentGuard { shared: Arc::clone(&self.shared), _not_send: PhantomData })
    }

    /// `true` when the calling thread currently holds the context.
    pub fn is_current(&self) -> bool {
        self.lock_currency().owner == Some(thread::current().id())
    }

    /// Marks the platform context as lost (or recovered). While lost,
    /// [`make_current`](Self::make_current) fails; existing guards stay valid.
    pub fn set_lost(&self, lost: bool) {
        if lost {
            log::warn!("context '{}' marked lost", self.shared.label);
        }
        self.shared.lost.store(lost, Ordering::Release);
    }

    pub fn is_lost(&self) -> bool {
        self.shared.lost.load(Ordering::Acquire)
    }

    /// Live allocations made against this context.
    pub fn live_resources(&self) -> usize {
        self.shared.tracker.live()
    }

    pub fn tracker(&self) -> &ResourceTracker {
        &self.shared.tracker
    }

    /// `true` when both handles wrap the same platform context.
    pub fn ptr_eq(&self, other: &ContextBinding) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    fn unavailable(&self, reason: UnavailableReason) -> ContextUnavailable {
        ContextUnavailable { label: self.shared.label.clone(), reason }
    }

    fn lock_currency(&self) -> MutexGuard<'_, Currency> {
        self.shared.currency.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for ContextBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextBinding")
            .field("label", &self.shared.label)
            .field("device", &self.shared.device.kind())
            .field("lost", &self.is_lost())
            .field("live_resources", &self.live_resources())
            .finish()
    }
}

/// Scoped currency of a [`ContextBinding`] on the current thread.
///
/// Not `Send`: currency belongs to the thread that acquired it.
pub struct CurrentGuard {
    shared: Arc<Shared>,
    _not_send: PhantomData<*const ()>,
}

impl CurrentGuard {
    pub fn device(&self) -> &GpuDevice {
        &self.shared.device
    }

    pub fn tracker(&self) -> &ResourceTracker {
        &self.shared.tracker
    }

    /// Creates a texture from tightly packed premultiplied RGBA8 rows.
    pub fn upload_rgba(&self, size: PixelSize, rgba: &[u8]) -> Result<Texture, BackendError> {
        BackendError::check_size(size, self.device().max_texture_dimension())?;
        if rgba.len() != size.rgba_len() {
            return Err(BackendError::PixelLength { expected: size.rgba_len(), got: rgba.len() });
        }

        let storage = match self.device() {
            GpuDevice::Software(_) => TextureStorage::Host(rgba.into()),
            GpuDevice::Wgpu(dev) => {
                let texture = readback::create_texture(
                    dev.device(),
                    "lumen upload texture",
                    size,
                    wgpu::TextureUsages::TEXTURE_BINDING
                        | wgpu::TextureUsages::COPY_DST
                        | wgpu::TextureUsages::COPY_SRC,
                );
                readback::write_rgba(dev.queue(), &texture, size, rgba);
                TextureStorage::Wgpu(texture)
            }
        };
        Ok(Texture::new(size, storage, self.tracker().acquire("texture")))
    }

    /// Reads a texture back into tightly packed premultiplied RGBA8 rows.
    pub fn read_pixels(&self, texture: &Texture) -> Result<Vec<u8>, BackendError> {
        match (texture.storage(), self.device()) {
            (TextureStorage::Host(px), _) => Ok(px.to_vec()),
            (TextureStorage::Wgpu(t), GpuDevice::Wgpu(dev)) => {
                readback::read_rgba(dev.device(), dev.queue(), t, texture.size())
            }
            (TextureStorage::Wgpu(_), GpuDevice::Software(_)) => {
                Err(BackendError::ForeignTexture { id: texture.id().0, device: "software" })
            }
        }
    }
}

impl Drop for CurrentGuard {
    fn drop(&mut self) {
        let mut currency = self.shared.currency.lock().unwrap_or_else(PoisonError::into_inner);
        currency.depth = currency.depth.saturating_sub(1);
        if currency.depth == 0 {
            currency.owner = None;
            log::trace!("context '{}' released", self.shared.label);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guards_nest_on_one_thread() {
        let ctx = ContextBinding::software();
        let outer = ctx.make_current().unwrap();
        let inner = ctx.make_current().unwrap();
        drop(outer);
        assert!(ctx.is_current());
        drop(inner);
        assert!(!ctx.is_current());
    }

    #[test]
    fn other_thread_is_refused_while_current() {
        let ctx = ContextBinding::software();
        let guard = ctx.make_current().unwrap();
        let remote = ctx.clone();
        let err = std::thread::spawn(move || remote.make_current().map(|_| ()).unwrap_err())
            .join()
            .unwrap();
        assert_eq!(err.reason, UnavailableReason::CurrentOnOtherThread);
        drop(guard);

        let remote = ctx.clone();
        assert!(std::thread::spawn(move || remote.make_current().is_ok()).join().unwrap());
    }

    #[test]
    fn released_on_error_path() {
        fn fails(ctx: &ContextBinding) -> Result<(), BackendError> {
            let cx = ctx.make_current().unwrap();
            cx.upload_rgba(PixelSize::new(2, 2), &[0; 3])?;
            Ok(())
        }
        let ctx = ContextBinding::software();
        assert!(matches!(fails(&ctx), Err(BackendError::PixelLength { expected: 16, got: 3 })));
        assert!(!ctx.is_current());
    }

    #[test]
    fn lost_context_is_unavailable() {
        let ctx = ContextBinding::software();
        ctx.set_lost(true);
        let err = ctx.make_current().map(|_| ()).unwrap_err();
        assert_eq!(err.reason, UnavailableReason::Lost);
        ctx.set_lost(false);
        assert!(ctx.make_current().is_ok());
    }

    #[test]
    fn upload_and_read_back() {
        let ctx = ContextBinding::software();
        let cx = ctx.make_current().unwrap();
        let px: Vec<u8> = (0..16).collect();
        let tex = cx.upload_rgba(PixelSize::new(2, 2), &px).unwrap();
        assert_eq!(ctx.live_resources(), 1);
        assert_eq!(cx.read_pixels(&tex).unwrap(), px);
        drop(tex);
        assert_eq!(ctx.live_resources(), 0);
    }

    #[test]
    fn upload_respects_device_limit() {
        let ctx = ContextBinding::new(
            "tiny",
            GpuDevice::Software(SoftwareDevice { max_texture_dimension: 4 }),
        );
        let cx = ctx.make_current().unwrap();
        let err = cx.upload_rgba(PixelSize::new(8, 1), &[0; 32]).unwrap_err();
        assert!(matches!(err, BackendError::TextureTooLarge { max: 4, .. }));
    }
}
