use crate::coords::Rect;
use crate::paint::Color;

/// Stroke drawn inside the outer edge of a quad.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Border {
    pub width: f32,
    pub color: Color,
}

/// Filled rounded rectangle. A circle is a square quad with
/// `radius = side / 2`.
#[derive(Debug, Clone, PartialEq)]
pub struct QuadCmd {
    pub rect: Rect,
    /// Premultiplied fill, already scaled by inherited opacity.
    pub color: Color,
    pub radius: f32,
    pub border: Option<Border>,
}

/// The current video frame stretched over `rect`.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameCmd {
    pub rect: Rect,
    pub opacity: f32,
}

/// Backend-agnostic draw command.
///
/// Adding a command: add the variant here, then teach both
/// `render::software` and `render::gpu` to paint it.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCmd {
    Quad(QuadCmd),
    Frame(FrameCmd),
}

impl DrawCmd {
    pub fn rect(&self) -> Rect {
        match self {
            DrawCmd::Quad(q) => q.rect,
            DrawCmd::Frame(f) => f.rect,
        }
    }
}
