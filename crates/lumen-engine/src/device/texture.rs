use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::coords::PixelSize;

use super::ResourceToken;

/// Process-unique texture identity.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u64);

impl TextureId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for TextureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where the texels of a [`Texture`] live.
pub enum TextureStorage {
    /// Tightly packed premultiplied RGBA8 rows owned by the software device.
    Host(Box<[u8]>),
    /// A wgpu texture in `Rgba8Unorm`.
    Wgpu(wgpu::Texture),
}

/// Reference-counted GPU texture handle (premultiplied RGBA8).
///
/// Cloning shares the same texels; the allocation is released, and its
/// tracker count dropped, when the last clone goes away.
#[derive(Clone)]
pub struct Texture {
    inner: Arc<TextureInner>,
}

struct TextureInner {
    id: TextureId,
    size: PixelSize,
    storage: TextureStorage,
    _token: ResourceToken,
}

impl Texture {
    pub(crate) fn new(size: PixelSize, storage: TextureStorage, token: ResourceToken) -> Self {
        Self {
            inner: Arc::new(TextureInner { id: TextureId::next(), size, storage, _token: token }),
        }
    }

    #[inline]
    pub fn id(&self) -> TextureId {
        self.inner.id
    }

    #[inline]
    pub fn size(&self) -> PixelSize {
        self.inner.size
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.inner.size.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.inner.size.height
    }

    #[inline]
    pub fn storage(&self) -> &TextureStorage {
        &self.inner.storage
    }

    /// Host texels, when the texture lives on the software device.
    pub fn host_pixels(&self) -> Option<&[u8]> {
        match &self.inner.storage {
            TextureStorage::Host(px) => Some(px),
            TextureStorage::Wgpu(_) => None,
        }
    }

    /// `true` when both handles refer to the same allocation.
    #[inline]
    pub fn ptr_eq(&self, other: &Texture) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Texture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let storage = match self.inner.storage {
            TextureStorage::Host(_) => "host",
            TextureStorage::Wgpu(_) => "wgpu",
        };
        f.debug_struct("Texture")
            .field("id", &self.inner.id)
            .field("size", &self.inner.size)
            .field("storage", &storage)
            .finish()
    }
}
