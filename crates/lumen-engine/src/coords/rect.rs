use super::Vec2;

/// Axis-aligned rectangle in pixels (top-left origin).
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Rect {
    pub origin: Vec2,
    pub size: Vec2,
}

impl Rect {
    #[inline]
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { origin: Vec2::new(x, y), size: Vec2::new(w, h) }
    }

    #[inline]
    pub const fn from_origin_size(origin: Vec2, size: Vec2) -> Self {
        Self { origin, size }
    }

    #[inline]
    pub fn max(self) -> Vec2 {
        self.origin + self.size
    }

    #[inline]
    pub fn center(self) -> Vec2 {
        self.origin + self.size * 0.5
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.size.x <= 0.0 || self.size.y <= 0.0
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.origin.is_finite() && self.size.is_finite()
    }

    /// Returns the rectangle moved by `offset`.
    #[inline]
    pub fn translate(self, offset: Vec2) -> Self {
        Self { origin: self.origin + offset, size: self.size }
    }

    /// Overlap of two rectangles; `None` when they only touch or are disjoint.
    #[inline]
    pub fn intersect(self, other: Rect) -> Option<Rect> {
        let x0 = self.origin.x.max(other.origin.x);
        let y0 = self.origin.y.max(other.origin.y);
        let x1 = self.max().x.min(other.max().x);
        let y1 = self.max().y.min(other.max().y);

        if x1 - x0 <= 0.0 || y1 - y0 <= 0.0 {
            None
        } else {
            Some(Rect::new(x0, y0, x1 - x0, y1 - y0))
        }
    }

    /// Integer pixel span `[x0, x1) x [y0, y1)` covered by this rect, clamped to
    /// the `width` x `height` target. Pixels are included when their footprint
    /// touches the rect.
    pub fn pixel_span(self, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
        let x0 = self.origin.x.floor().max(0.0) as u32;
        let y0 = self.origin.y.floor().max(0.0) as u32;
        let x1 = (self.max().x.ceil().max(0.0) as u32).min(width);
        let y1 = (self.max().y.ceil().max(0.0) as u32).min(height);
        if x0 >= x1 || y0 >= y1 { None } else { Some((x0, y0, x1, y1)) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(x: f32, y: f32, w: f32, h: f32) -> Rect { Rect::new(x, y, w, h) }

    #[test]
    fn intersect_overlapping() {
        assert_eq!(r(0.0, 0.0, 10.0, 10.0).intersect(r(5.0, 5.0, 10.0, 10.0)), Some(r(5.0, 5.0, 5.0, 5.0)));
    }

    #[test]
    fn intersect_touching_edge_returns_none() {
        assert!(r(0.0, 0.0, 10.0, 10.0).intersect(r(10.0, 0.0, 10.0, 10.0)).is_none());
    }

    #[test]
    fn translate_keeps_size() {
        let moved = r(1.0, 2.0, 3.0, 4.0).translate(Vec2::new(10.0, 20.0));
        assert_eq!(moved, r(11.0, 22.0, 3.0, 4.0));
    }

    #[test]
    fn pixel_span_clamps_to_bounds() {
        assert_eq!(r(-5.0, 2.5, 20.0, 3.0).pixel_span(10, 10), Some((0, 2, 10, 6)));
    }

    #[test]
    fn pixel_span_outside_is_none() {
        assert_eq!(r(12.0, 0.0, 4.0, 4.0).pixel_span(10, 10), None);
    }
}
