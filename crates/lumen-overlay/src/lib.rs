//! Scene overlay compositing for GPU video streams.
//!
//! A declarative `.lml` scene is compiled into a render tree and drawn over
//! every incoming frame. Animations run on the frame's presentation
//! timestamp, so replaying a stream reproduces the same output.
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`compositor`] | `OverlayCompositor` state machine and `OverlayConfig` |
//! | [`renderer`] | `SceneRenderer`, `RenderTarget`, `RenderSettings` |
//! | [`surface`] | `FrameSurface`, the render-visible current frame |
//! | [`scene`] | scene compilation, node handles, animations |
//! | [`frame`] | host-side `FrameBuffer`, caps, and metadata |
//! | [`error`] | error taxonomy |
//!
//! ```rust,ignore
//! use lumen_engine::device::ContextBinding;
//! use lumen_overlay::{OverlayCompositor, OverlayConfig, VideoCaps};
//!
//! let ctx = ContextBinding::software();
//! let mut overlay = OverlayCompositor::new(OverlayConfig::with_scene(
//!     "Item { VideoItem { fill: parent } Rectangle { width: 64; height: 64; color: 'red' } }",
//! ));
//! overlay.on_scene_initialized(|root| log::info!("scene ready: {root:?}"));
//! overlay.start(&ctx)?;
//! overlay.set_caps(VideoCaps::new(640, 480), VideoCaps::new(640, 480))?;
//! let out = overlay.process_frame(&input)?;
//! out.sync_point().map(|s| s.wait());
//! overlay.stop()?;
//! ```

pub mod compositor;
pub mod error;
pub mod frame;
pub mod renderer;
pub mod scene;
pub mod surface;

pub use compositor::{CompositorState, OverlayCompositor, OverlayConfig};
pub use error::{ConfigError, InitError, OverlayError, RenderError, SceneError};
pub use frame::{copy_metadata, CustomMeta, FrameBuffer, FrameFlags, MetaScope, VideoCaps, VideoFormat, VideoMeta};
pub use renderer::{RenderSettings, RenderTarget, SceneRenderer};
pub use scene::{ComponentRegistry, NodeHandle, Scene};
pub use surface::FrameSurface;
