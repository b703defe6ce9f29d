use std::sync::{Mutex, MutexGuard, PoisonError};

use lumen_engine::device::Texture;

use crate::frame::VideoCaps;

/// The current input frame as seen from inside the scene.
///
/// Shared between the compositor, which writes it once per input frame, and
/// the renderer, which samples it during the following render pass. The
/// renderer only keeps a `Weak` reference, so whichever holder lives longer
/// decides the surface's lifetime.
///
/// Reads never wait on a frame: with no frame set, [`current_frame`]
/// returns `None` and `VideoItem`s render transparent.
///
/// [`current_frame`]: Self::current_frame
#[derive(Debug, Default)]
pub struct FrameSurface {
    state: Mutex<SurfaceState>,
}

#[derive(Debug, Default)]
struct SurfaceState {
    caps: Option<VideoCaps>,
    frame: Option<Texture>,
    generation: u64,
}

impl FrameSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the sampled frame. `None` clears it and drops the reference
    /// to the previous frame's memory.
    pub fn set_frame(&self, frame: Option<Texture>) {
        let mut state = self.lock();
        state.frame = frame;
        state.generation += 1;
    }

    pub fn set_caps(&self, caps: VideoCaps) {
        self.lock().caps = Some(caps);
    }

    pub fn current_frame(&self) -> Option<Texture> {
        self.lock().frame.clone()
    }

    pub fn has_frame(&self) -> bool {
        self.lock().frame.is_some()
    }

    pub fn caps(&self) -> Option<VideoCaps> {
        self.lock().caps.clone()
    }

    /// Number of `set_frame` calls so far.
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    // A panicked writer leaves plain data behind; keep serving it.
    fn lock(&self) -> MutexGuard<'_, SurfaceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_engine::coords::PixelSize;
    use lumen_engine::device::ContextBinding;

    #[test]
    fn empty_surface_reads_none() {
        let surface = FrameSurface::new();
        assert!(surface.current_frame().is_none());
        assert!(surface.caps().is_none());
        assert_eq!(surface.generation(), 0);
    }

    #[test]
    fn clearing_releases_the_frame() {
        let ctx = ContextBinding::software();
        let cx = ctx.make_current().unwrap();
        let surface = FrameSurface::new();
        surface.set_caps(VideoCaps::new(1, 1));
        surface.set_frame(Some(cx.upload_rgba(PixelSize::new(1, 1), &[1, 2, 3, 4]).unwrap()));
        assert!(surface.has_frame());
        assert_eq!(ctx.live_resources(), 1);

        surface.set_frame(None);
        assert!(!surface.has_frame());
        assert_eq!(ctx.live_resources(), 0);
        assert_eq!(surface.generation(), 2);
        assert_eq!(surface.caps(), Some(VideoCaps::new(1, 1)));
    }
}
