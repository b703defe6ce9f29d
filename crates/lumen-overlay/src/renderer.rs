use std::sync::Weak;

use lumen_engine::coords::PixelSize;
use lumen_engine::device::{ContextBinding, SyncPoint, Texture};
use lumen_engine::paint::Color;
use lumen_engine::render::{create_backend, RenderBackend, RenderPass};
use lumen_engine::scene::DrawList;
use lumen_engine::time::ClockTime;
use lumen_markup::Value;

use crate::error::{InitError, RenderError, SceneError};
use crate::scene::{compile_source, ComponentRegistry, NodeHandle, Scene};
use crate::surface::FrameSurface;

/// Output parameters of the render passes.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSettings {
    pub size: PixelSize,
    pub clear_color: Color,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self { size: PixelSize::new(640, 480), clear_color: Color::TRANSPARENT }
    }
}

/// Texture produced by one render pass. Never reused across passes.
#[derive(Debug)]
pub struct RenderTarget {
    texture: Texture,
}

impl RenderTarget {
    #[inline]
    pub fn width(&self) -> u32 {
        self.texture.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.texture.height()
    }

    #[inline]
    pub fn size(&self) -> PixelSize {
        self.texture.size()
    }

    pub fn texture(&self) -> &Texture {
        &self.texture
    }

    pub fn into_texture(self) -> Texture {
        self.texture
    }
}

/// Compiles scenes and runs synchronous, timestamp-driven render passes.
///
/// Every GPU call happens with the bound context made current; the guard is
/// dropped before each method returns, including on errors.
pub struct SceneRenderer {
    context: Option<ContextBinding>,
    backend: Option<Box<dyn RenderBackend>>,
    scene: Option<Scene>,
    components: ComponentRegistry,
    surface: Weak<FrameSurface>,
    settings: RenderSettings,
    draw_list: DrawList,
}

impl SceneRenderer {
    /// `surface` is sampled by `VideoItem`s; a dropped surface renders as
    /// no frame.
    pub fn new(surface: Weak<FrameSurface>, settings: RenderSettings) -> Self {
        Self {
            context: None,
            backend: None,
            scene: None,
            components: ComponentRegistry::new(),
            surface,
            settings,
            draw_list: DrawList::new(),
        }
    }

    /// Allocates the render backend on `context`.
    pub fn init(&mut self, context: &ContextBinding) -> Result<(), InitError> {
        let cx = context.make_current()?;
        let backend = create_backend(&cx)?;
        log::info!("scene renderer initialized ({} backend on '{}')", backend.name(), context.label());

        self.backend = Some(backend);
        self.context = Some(context.clone());
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.backend.is_some()
    }

    pub fn components(&self) -> &ComponentRegistry {
        &self.components
    }

    /// Components that scene sources may `import`.
    pub fn components_mut(&mut self) -> &mut ComponentRegistry {
        &mut self.components
    }

    /// Compiles `src` and makes it the active scene.
    ///
    /// On error the previously loaded scene stays active and its handles
    /// stay valid.
    pub fn set_scene(&mut self, src: &str) -> Result<(), SceneError> {
        let scene = self.compile_scene(src)?;
        self.install_scene(scene);
        Ok(())
    }

    /// Compiles `src` against the registered components without touching
    /// the active scene.
    pub fn compile_scene(&self, src: &str) -> Result<Scene, SceneError> {
        compile_source(src, &self.components)
    }

    /// Makes an already compiled scene active. Handles into the previous
    /// scene become stale.
    pub fn install_scene(&mut self, scene: Scene) {
        if let Some(old) = self.scene.replace(scene) {
            log::debug!("replaced scene {}", old.id());
        }
    }

    pub fn scene(&self) -> Option<&Scene> {
        self.scene.as_ref()
    }

    /// Root of the active scene. `None` when no scene is loaded or the
    /// scene has no root element.
    pub fn root_node(&self) -> Option<NodeHandle> {
        self.scene.as_ref()?.root()
    }

    pub fn set_property(&mut self, node: NodeHandle, key: &str, value: &Value) -> Result<(), SceneError> {
        self.scene.as_mut().ok_or(SceneError::NoScene)?.set_property(node, key, value)
    }

    /// Sets the size of subsequent render targets.
    pub fn resize(&mut self, width: u32, height: u32) {
        let size = PixelSize::new(width, height);
        if size != self.settings.size {
            log::debug!("render size {} -> {}", self.settings.size, size);
            self.settings.size = size;
        }
    }

    pub fn size(&self) -> PixelSize {
        self.settings.size
    }

    pub fn set_clear_color(&mut self, color: Color) {
        self.settings.clear_color = color;
    }

    /// Renders the active scene with `timestamp` as the animation clock.
    ///
    /// Returns once the pass is submitted; see [`sync_point`](Self::sync_point).
    pub fn render(&mut self, timestamp: ClockTime) -> Result<RenderTarget, RenderError> {
        let (Some(context), Some(backend)) = (&self.context, self.backend.as_mut()) else {
            return Err(RenderError::NotInitialized);
        };
        let scene = self.scene.as_ref().ok_or(RenderError::NoScene)?;
        let cx = context.make_current()?;

        self.draw_list.clear();
        scene.paint(timestamp, self.settings.size, &mut self.draw_list);

        let frame = self.surface.upgrade().and_then(|s| s.current_frame());
        let texture = backend.render(
            &cx,
            RenderPass {
                draw_list: &mut self.draw_list,
                frame: frame.as_ref(),
                size: self.settings.size,
                clear: self.settings.clear_color,
            },
        )?;
        log::trace!("rendered {} items at {timestamp} into texture {}", self.draw_list.len(), texture.id());
        Ok(RenderTarget { texture })
    }

    /// Fence for every pass rendered so far.
    pub fn sync_point(&mut self) -> Result<SyncPoint, RenderError> {
        let (Some(context), Some(backend)) = (&self.context, self.backend.as_mut()) else {
            return Err(RenderError::NotInitialized);
        };
        let cx = context.make_current()?;
        Ok(backend.sync_point(&cx))
    }

    /// Reads a render target back into tightly packed premultiplied RGBA8.
    pub fn read_pixels(&self, target: &RenderTarget) -> Result<Vec<u8>, RenderError> {
        let context = self.context.as_ref().ok_or(RenderError::NotInitialized)?;
        let cx = context.make_current()?;
        Ok(cx.read_pixels(&target.texture)?)
    }

    /// Releases the backend, the scene, and the context. Idempotent.
    pub fn cleanup(&mut self) {
        let Some(context) = self.context.take() else {
            self.backend = None;
            self.scene = None;
            return;
        };
        // Release under the context when possible; a lost context still
        // gets its handles dropped.
        let guard = match context.make_current() {
            Ok(cx) => Some(cx),
            Err(e) => {
                log::warn!("cleanup without current context: {e}");
                None
            }
        };
        self.backend = None;
        self.scene = None;
        self.draw_list.clear();
        drop(guard);
        log::debug!("scene renderer cleaned up ('{}')", context.label());
    }
}

impl Drop for SceneRenderer {
    fn drop(&mut self) {
        self.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use lumen_engine::device::{GpuDevice, SoftwareDevice};

    use super::*;

    fn renderer(ctx: &ContextBinding) -> SceneRenderer {
        let mut r = SceneRenderer::new(Weak::new(), RenderSettings::default());
        r.init(ctx).unwrap();
        r
    }

    #[test]
    fn render_before_init_fails() {
        let mut r = SceneRenderer::new(Weak::new(), RenderSettings::default());
        r.set_scene("Item { }").unwrap();
        assert_eq!(r.render(ClockTime::ZERO).unwrap_err(), RenderError::NotInitialized);
    }

    #[test]
    fn render_without_scene_fails() {
        let ctx = ContextBinding::software();
        let mut r = renderer(&ctx);
        assert_eq!(r.render(ClockTime::ZERO).unwrap_err(), RenderError::NoScene);
        assert!(!ctx.is_current());
    }

    #[test]
    fn failed_set_scene_keeps_previous() {
        let ctx = ContextBinding::software();
        let mut r = renderer(&ctx);
        r.set_scene("Rectangle { color: 'red' }").unwrap();
        let root = r.root_node().unwrap();

        assert!(matches!(r.set_scene(""), Err(SceneError::NotFound(_))));
        assert!(matches!(r.set_scene("Rectangle {"), Err(SceneError::CompileFailed { .. })));
        assert_eq!(r.root_node(), Some(root));
        assert_eq!(r.scene().unwrap().source(), "Rectangle { color: 'red' }");
    }

    #[test]
    fn compile_scene_leaves_active_scene() {
        let ctx = ContextBinding::software();
        let mut r = renderer(&ctx);
        r.set_scene("Item { }").unwrap();
        let root = r.root_node();

        let pending = r.compile_scene("// empty").unwrap();
        assert!(pending.root().is_none());
        assert_eq!(r.root_node(), root);

        let next = r.compile_scene("Rectangle { }").unwrap();
        let next_root = next.root();
        r.install_scene(next);
        assert_eq!(r.root_node(), next_root);
    }

    #[test]
    fn replacing_scene_invalidates_handles() {
        let ctx = ContextBinding::software();
        let mut r = renderer(&ctx);
        r.set_scene("Item { }").unwrap();
        let old = r.root_node().unwrap();
        r.set_scene("Item { }").unwrap();
        assert_ne!(r.root_node(), Some(old));
        assert_eq!(r.set_property(old, "x", &Value::Number(1.0)), Err(SceneError::StaleHandle));
    }

    #[test]
    fn renders_configured_size() {
        let ctx = ContextBinding::software();
        let mut r = renderer(&ctx);
        r.set_scene("Rectangle { color: 'red' }").unwrap();
        r.resize(8, 4);
        let target = r.render(ClockTime::ZERO).unwrap();
        assert_eq!((target.width(), target.height()), (8, 4));
        let px = r.read_pixels(&target).unwrap();
        assert_eq!(&px[..4], &[255, 0, 0, 255]);
    }

    #[test]
    fn samples_surface_frame() {
        let ctx = ContextBinding::software();
        let surface = Arc::new(FrameSurface::new());
        let mut r = SceneRenderer::new(Arc::downgrade(&surface), RenderSettings {
            size: PixelSize::new(2, 2),
            clear_color: Color::TRANSPARENT,
        });
        r.init(&ctx).unwrap();
        r.set_scene("VideoItem { }").unwrap();

        let frame = {
            let cx = ctx.make_current().unwrap();
            cx.upload_rgba(PixelSize::new(1, 1), &[0, 0, 255, 255]).unwrap()
        };
        surface.set_frame(Some(frame));
        let target = r.render(ClockTime::ZERO).unwrap();
        assert_eq!(r.read_pixels(&target).unwrap(), [0u8, 0, 255, 255].repeat(4));

        drop(surface);
        let target = r.render(ClockTime::ZERO).unwrap();
        assert!(r.read_pixels(&target).unwrap().iter().all(|&b| b == 0));
    }

    #[test]
    fn oversized_target_is_gpu_failure() {
        let ctx = ContextBinding::new("small", GpuDevice::Software(SoftwareDevice { max_texture_dimension: 16 }));
        let mut r = renderer(&ctx);
        r.set_scene("Item { }").unwrap();
        r.resize(32, 32);
        assert!(matches!(r.render(ClockTime::ZERO), Err(RenderError::GpuFailure(_))));
    }

    #[test]
    fn cleanup_is_idempotent_and_releases() {
        let ctx = ContextBinding::software();
        let mut r = renderer(&ctx);
        r.set_scene("Item { }").unwrap();
        let target = r.render(ClockTime::ZERO).unwrap();
        drop(target);
        assert!(ctx.live_resources() > 0);

        r.cleanup();
        r.cleanup();
        assert_eq!(ctx.live_resources(), 0);
        assert!(r.root_node().is_none());
        assert!(!r.is_initialized());
    }

    #[test]
    fn sync_points_advance() {
        let ctx = ContextBinding::software();
        let mut r = renderer(&ctx);
        let a = r.sync_point().unwrap();
        let b = r.sync_point().unwrap();
        assert!(b.seq() > a.seq());
        assert!(b.wait().is_ok());
    }
}
