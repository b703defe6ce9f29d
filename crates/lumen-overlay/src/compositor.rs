use std::fmt;
use std::sync::{Arc, Weak};

use lumen_engine::device::ContextBinding;
use lumen_engine::paint::Color;
use lumen_engine::time::ClockTime;
use lumen_markup::Value;

use crate::error::{ConfigError, OverlayError, SceneError};
use crate::frame::{copy_metadata, FrameBuffer, VideoCaps, VideoMeta};
use crate::renderer::{RenderSettings, SceneRenderer};
use crate::scene::{ComponentRegistry, NodeHandle};
use crate::surface::FrameSurface;

// ── configuration ─────────────────────────────────────────────────────────

/// Host-facing configuration of an [`OverlayCompositor`].
#[derive(Debug, Clone)]
pub struct OverlayConfig {
    /// `.lml` scene source. Required to start.
    pub scene: Option<String>,
    /// Surface supplied by the host, e.g. one already shown in a UI. When
    /// `None` the compositor creates its own.
    pub surface: Option<Arc<FrameSurface>>,
    pub clear_color: Color,
    /// Size the output video meta's width from the input caps instead of
    /// the output caps. Off by default; only for hosts that depend on the
    /// old behavior.
    pub meta_width_from_input: bool,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self { scene: None, surface: None, clear_color: Color::TRANSPARENT, meta_width_from_input: false }
    }
}

impl OverlayConfig {
    pub fn with_scene(scene: impl Into<String>) -> Self {
        Self { scene: Some(scene.into()), ..Self::default() }
    }
}

// ── state ─────────────────────────────────────────────────────────────────

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CompositorState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

impl fmt::Display for CompositorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CompositorState::Stopped => "stopped",
            CompositorState::Starting => "starting",
            CompositorState::Running => "running",
            CompositorState::Stopping => "stopping",
        })
    }
}

type SceneInitializedFn = Box<dyn FnMut(NodeHandle) + Send>;
type ErrorFn = Box<dyn FnMut(&OverlayError) + Send>;

struct Negotiated {
    input: VideoCaps,
    output: VideoCaps,
}

// ── compositor ────────────────────────────────────────────────────────────

/// Draws a scene over every input frame.
///
/// Lifecycle: `Stopped -> Starting -> Running -> Stopping -> Stopped`. A
/// failure during start leaves the compositor `Stopped`. Per-frame calls
/// must be serialized by the host; nothing here renders in parallel.
pub struct OverlayCompositor {
    config: OverlayConfig,
    state: CompositorState,
    components: ComponentRegistry,
    surface: Arc<FrameSurface>,
    context: Option<ContextBinding>,
    renderer: Option<SceneRenderer>,
    caps: Option<Negotiated>,
    last_pts: ClockTime,
    on_scene_initialized: Option<SceneInitializedFn>,
    on_error: Option<ErrorFn>,
}

impl OverlayCompositor {
    pub fn new(mut config: OverlayConfig) -> Self {
        let surface = config.surface.take().unwrap_or_default();
        Self {
            config,
            state: CompositorState::Stopped,
            components: ComponentRegistry::new(),
            surface,
            context: None,
            renderer: None,
            caps: None,
            last_pts: ClockTime::ZERO,
            on_scene_initialized: None,
            on_error: None,
        }
    }

    pub fn state(&self) -> CompositorState {
        self.state
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    /// Called once per successful start with the scene's root node.
    pub fn on_scene_initialized(&mut self, f: impl FnMut(NodeHandle) + Send + 'static) {
        self.on_scene_initialized = Some(Box::new(f));
    }

    /// Called for every failure reported to the host.
    pub fn on_error(&mut self, f: impl FnMut(&OverlayError) + Send + 'static) {
        self.on_error = Some(Box::new(f));
    }

    /// Registers an importable component. Takes effect at the next scene
    /// compile.
    pub fn register_component(&mut self, alias: &str, src: &str) -> Result<(), SceneError> {
        self.components.parse_and_register(alias, src)?;
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.components_mut().parse_and_register(alias, src)?;
        }
        Ok(())
    }

    /// Replaces the scene source.
    ///
    /// While running the scene is recompiled immediately. A scene that
    /// fails to compile or has no root element is rejected; the running
    /// scene and the configured source then stay unchanged.
    pub fn set_scene_source(&mut self, src: impl Into<String>) -> Result<(), OverlayError> {
        let src = src.into();
        if let Some(renderer) = self.renderer.as_mut() {
            let scene = match renderer.compile_scene(&src) {
                Ok(scene) if scene.root().is_some() => scene,
                Ok(_) => return Err(self.report(SceneError::NoRootNode.into())),
                Err(e) => return Err(self.report(e.into())),
            };
            renderer.install_scene(scene);
            log::info!("scene replaced while {}", self.state);
        }
        self.config.scene = Some(src);
        Ok(())
    }

    /// Root node of the running scene.
    pub fn root_node(&self) -> Option<NodeHandle> {
        self.renderer.as_ref()?.root_node()
    }

    pub fn set_node_property(
        &mut self,
        node: NodeHandle,
        key: &str,
        value: Value,
    ) -> Result<(), OverlayError> {
        let renderer = self.renderer.as_mut().ok_or(SceneError::NoScene)?;
        Ok(renderer.set_property(node, key, &value)?)
    }

    /// Non-owning handle to the frame surface.
    ///
    /// The compositor keeps the surface alive only while it exists. A caller
    /// that holds on to the surface past that point (e.g. to show it in a
    /// UI) must upgrade and keep its own `Arc`; a failed upgrade means the
    /// surface is gone.
    pub fn surface(&self) -> Weak<FrameSurface> {
        Arc::downgrade(&self.surface)
    }

    /// Swaps in a host-owned surface, or a fresh private one for `None`.
    ///
    /// Only allowed while stopped, since the renderer holds a weak handle to
    /// the surface it was started with. The compositor keeps its own `Arc`
    /// only; a host that wants the surface to outlive the compositor must
    /// hold one too.
    pub fn set_surface(&mut self, surface: Option<Arc<FrameSurface>>) -> Result<(), OverlayError> {
        self.expect_state(CompositorState::Stopped, "set surface")?;
        self.surface = surface.unwrap_or_default();
        Ok(())
    }

    pub fn renderer(&self) -> Option<&SceneRenderer> {
        self.renderer.as_ref()
    }

    // ── lifecycle ─────────────────────────────────────────────────────────

    /// `Stopped -> Running`: compiles the scene on `context`.
    pub fn start(&mut self, context: &ContextBinding) -> Result<(), OverlayError> {
        self.expect_state(CompositorState::Stopped, "start")?;

        let Some(src) = self.config.scene.clone().filter(|s| !s.trim().is_empty()) else {
            return Err(self.report(ConfigError::MissingScene.into()));
        };

        self.state = CompositorState::Starting;
        match self.start_renderer(context, &src) {
            Ok((renderer, root)) => {
                if self.config.meta_width_from_input {
                    log::warn!("output video meta width follows the input caps (compatibility mode)");
                }
                self.renderer = Some(renderer);
                self.context = Some(context.clone());
                self.last_pts = ClockTime::ZERO;
                self.state = CompositorState::Running;
                log::info!("overlay started on '{}'", context.label());

                if let Some(f) = self.on_scene_initialized.as_mut() {
                    f(root);
                }
                Ok(())
            }
            Err(e) => {
                self.state = CompositorState::Stopped;
                Err(self.report(e))
            }
        }
    }

    fn start_renderer(
        &self,
        context: &ContextBinding,
        src: &str,
    ) -> Result<(SceneRenderer, NodeHandle), OverlayError> {
        let _cx = context.make_current()?;

        // Sized by the first set_caps.
        let settings = RenderSettings { clear_color: self.config.clear_color, ..RenderSettings::default() };
        let mut renderer = SceneRenderer::new(Arc::downgrade(&self.surface), settings);
        *renderer.components_mut() = self.components.clone();

        // Dropping the renderer on any early return releases what init got.
        renderer.init(context)?;
        renderer.set_scene(src)?;
        let root = renderer.root_node().ok_or(SceneError::NoRootNode)?;
        Ok((renderer, root))
    }

    /// `Running -> Stopped`: releases the frame, the renderer, and the
    /// context.
    pub fn stop(&mut self) -> Result<(), OverlayError> {
        self.expect_state(CompositorState::Running, "stop")?;
        self.state = CompositorState::Stopping;

        self.surface.set_frame(None);
        if let Some(mut renderer) = self.renderer.take() {
            renderer.cleanup();
        }
        if let Some(context) = self.context.take() {
            log::info!("overlay stopped on '{}'", context.label());
        }
        self.caps = None;
        self.last_pts = ClockTime::ZERO;

        self.state = CompositorState::Stopped;
        Ok(())
    }

    /// Stores negotiated caps and resizes the renderer to the output.
    pub fn set_caps(&mut self, input: VideoCaps, output: VideoCaps) -> Result<(), OverlayError> {
        self.expect_state(CompositorState::Running, "set caps")?;
        log::debug!("caps negotiated: in {input}, out {output}");
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.resize(output.width, output.height);
        }
        self.surface.set_caps(input.clone());
        self.caps = Some(Negotiated { input, output });
        Ok(())
    }

    /// Changes the output size of subsequent frames.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), OverlayError> {
        self.expect_state(CompositorState::Running, "resize")?;
        if let Some(caps) = self.caps.as_mut() {
            caps.output.width = width;
            caps.output.height = height;
        }
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.resize(width, height);
        }
        Ok(())
    }

    // ── per-frame ─────────────────────────────────────────────────────────

    /// Renders the scene over `input` and returns the output frame.
    ///
    /// The output holds one memory (the render target), a video meta for
    /// the output caps, a sync point for the pass, and `input`'s metadata.
    /// On failure the error is reported and no output is produced.
    pub fn process_frame(&mut self, input: &FrameBuffer) -> Result<FrameBuffer, OverlayError> {
        self.expect_state(CompositorState::Running, "process frames")?;
        let Some(caps) = self.caps.as_ref() else {
            return Err(self.report(OverlayError::NotNegotiated));
        };
        self.surface.set_caps(caps.input.clone());
        self.surface.set_frame(input.memory(0).cloned());

        let pts = input.pts.unwrap_or(self.last_pts);
        self.last_pts = pts;

        let Some(renderer) = self.renderer.as_mut() else {
            return Err(self.report(OverlayError::InvalidState { operation: "process frames", state: self.state }));
        };
        let result = renderer.render(pts).and_then(|target| Ok((target, renderer.sync_point()?)));
        let (target, sync) = match result {
            Ok(v) => v,
            Err(e) => {
                log::error!("render failed at {pts}: {e}");
                return Err(self.report(e.into()));
            }
        };

        // Sized only after the render accepted the output dimensions.
        let meta = self.output_meta();
        let mut output = FrameBuffer::new();
        output.append_memory(target.into_texture());
        if let Some(meta) = meta {
            output.set_video_meta(meta);
        }
        output.set_sync_point(sync);
        copy_metadata(input, &mut output);
        Ok(output)
    }

    /// Second phase of the host's buffer contract. All work happens in
    /// [`process_frame`](Self::process_frame).
    pub fn transform(&mut self, _input: &FrameBuffer, _output: &mut FrameBuffer) -> Result<(), OverlayError> {
        Ok(())
    }

    // ── helpers ───────────────────────────────────────────────────────────

    fn output_meta(&self) -> Option<VideoMeta> {
        let caps = self.caps.as_ref()?;
        let width = if self.config.meta_width_from_input { caps.input.width } else { caps.output.width };
        Some(VideoMeta::new(caps.output.format, width, caps.output.height))
    }

    fn expect_state(&self, expected: CompositorState, operation: &'static str) -> Result<(), OverlayError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(OverlayError::InvalidState { operation, state: self.state })
        }
    }

    fn report(&mut self, err: OverlayError) -> OverlayError {
        log::error!("overlay: {err}");
        if let Some(f) = self.on_error.as_mut() {
            f(&err);
        }
        err
    }
}

impl Drop for OverlayCompositor {
    fn drop(&mut self) {
        if self.state == CompositorState::Running {
            let _ = self.stop();
        }
    }
}

impl fmt::Debug for OverlayCompositor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverlayCompositor")
            .field("state", &self.state)
            .field("scene", &self.config.scene.as_ref().map(|s| s.len()))
            .field("negotiated", &self.caps.is_some())
            .finish()
    }
}
