use crate::coords::{PixelSize, Rect, Vec2};
use crate::device::{
    BackendError, CurrentGuard, ResourceToken, SyncPoint, Texture, TextureStorage,
};
use crate::paint::Color;
use crate::scene::{DrawCmd, FrameCmd, QuadCmd};

use super::{RenderBackend, RenderPass};

/// CPU rasterizer used on the software device.
///
/// Coverage comes from the signed distance to each shape sampled at pixel
/// centers, matching the WGSL shader. Blending runs in `f32` and quantizes
/// once at the end, so output bytes depend only on the draw list.
pub struct SoftwareBackend {
    max_dimension: u32,
    accum: Vec<[f32; 4]>,
    sync_seq: u64,
    _token: ResourceToken,
}

impl SoftwareBackend {
    pub fn new(cx: &CurrentGuard) -> Self {
        Self {
            max_dimension: cx.device().max_texture_dimension(),
            accum: Vec::new(),
            sync_seq: 0,
            _token: cx.tracker().acquire("software raster scratch"),
        }
    }

    fn paint_quad(&mut self, size: PixelSize, clip: Option<Rect>, cmd: &QuadCmd) {
        if cmd.rect.is_empty() || !cmd.rect.is_finite() {
            return;
        }
        let Some(span) = visible_span(cmd.rect, clip, size) else { return };

        let half = cmd.rect.size * 0.5;
        let center = cmd.rect.center();
        let radius = cmd.radius.clamp(0.0, half.min_component());
        let (border_width, border_color) = match cmd.border {
            Some(b) if b.width > 0.0 => (b.width, b.color),
            _ => (0.0, Color::TRANSPARENT),
        };

        for y in span.1..span.3 {
            for x in span.0..span.2 {
                let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5) - center;
                let d = rounded_rect_sdf(p, half, radius);
                let coverage = (0.5 - d).clamp(0.0, 1.0);
                if coverage <= 0.0 {
                    continue;
                }
                let inner = if border_width > 0.0 {
                    (0.5 - (d + border_width)).clamp(0.0, 1.0)
                } else {
                    coverage
                };
                let src = [
                    cmd.color.r * inner + border_color.r * (coverage - inner),
                    cmd.color.g * inner + border_color.g * (coverage - inner),
                    cmd.color.b * inner + border_color.b * (coverage - inner),
                    cmd.color.a * inner + border_color.a * (coverage - inner),
                ];
                blend_over(&mut self.accum[(y * size.width + x) as usize], src);
            }
        }
    }

    fn paint_frame(&mut self, size: PixelSize, clip: Option<Rect>, cmd: &FrameCmd, frame: &Texture) {
        if cmd.rect.is_empty() || cmd.opacity <= 0.0 {
            return;
        }
        let Some(texels) = frame.host_pixels() else {
            log::warn!("software backend cannot sample wgpu texture {}; frame skipped", frame.id());
            return;
        };
        // Frame edges are hard: a pixel is inside when its center is.
        let Some(span) = visible_span(center_rect(cmd.rect), clip, size) else { return };

        let fw = frame.width();
        let fh = frame.height();
        let opacity = cmd.opacity.clamp(0.0, 1.0);
        for y in span.1..span.3 {
            let v = (y as f32 + 0.5 - cmd.rect.origin.y) / cmd.rect.size.y;
            let sy = ((v * fh as f32) as u32).min(fh - 1);
            for x in span.0..span.2 {
                let u = (x as f32 + 0.5 - cmd.rect.origin.x) / cmd.rect.size.x;
                let sx = ((u * fw as f32) as u32).min(fw - 1);
                let i = ((sy * fw + sx) * 4) as usize;
                let src = [
                    texels[i] as f32 / 255.0 * opacity,
                    texels[i + 1] as f32 / 255.0 * opacity,
                    texels[i + 2] as f32 / 255.0 * opacity,
                    texels[i + 3] as f32 / 255.0 * opacity,
                ];
                blend_over(&mut self.accum[(y * size.width + x) as usize], src);
            }
        }
    }
}

impl RenderBackend for SoftwareBackend {
    fn name(&self) -> &'static str {
        "software"
    }

    fn render(&mut self, cx: &CurrentGuard, pass: RenderPass<'_>) -> Result<Texture, BackendError> {
        let RenderPass { draw_list, frame, size, clear } = pass;
        BackendError::check_size(size, self.max_dimension)?;

        self.accum.clear();
        self.accum.resize(size.width as usize * size.height as usize, clear.to_array());

        for item in draw_list.iter_in_paint_order() {
            if item.clip_rect.is_some_and(|c| c.is_empty()) {
                continue;
            }
            match &item.cmd {
                DrawCmd::Quad(q) => self.paint_quad(size, item.clip_rect, q),
                DrawCmd::Frame(f) => {
                    if let Some(frame) = frame {
                        self.paint_frame(size, item.clip_rect, f, frame);
                    }
                }
            }
        }

        let mut texels = Vec::with_capacity(size.rgba_len());
        for px in &self.accum {
            texels.extend_from_slice(&Color::from_premul(px[0], px[1], px[2], px[3]).to_rgba8());
        }

        Ok(Texture::new(
            size,
            TextureStorage::Host(texels.into_boxed_slice()),
            cx.tracker().acquire("texture"),
        ))
    }

    fn sync_point(&mut self, _cx: &CurrentGuard) -> SyncPoint {
        self.sync_seq += 1;
        SyncPoint::signaled(self.sync_seq)
    }
}

/// Signed distance from `p` (relative to the center) to a rounded box.
#[inline]
fn rounded_rect_sdf(p: Vec2, half: Vec2, radius: f32) -> f32 {
    let q = p.abs() - half + radius;
    q.max(Vec2::ZERO).length() + q.max_component().min(0.0) - radius
}

#[inline]
fn blend_over(dst: &mut [f32; 4], src: [f32; 4]) {
    let inv = 1.0 - src[3];
    for c in 0..4 {
        dst[c] = src[c] + dst[c] * inv;
    }
}

/// Shrinks `r` by half a pixel so that `pixel_span` selects exactly the
/// pixels whose centers lie inside `r`.
#[inline]
fn center_rect(r: Rect) -> Rect {
    let x0 = (r.origin.x - 0.5).ceil();
    let y0 = (r.origin.y - 0.5).ceil();
    let x1 = (r.max().x - 0.5).ceil();
    let y1 = (r.max().y - 0.5).ceil();
    Rect::new(x0, y0, x1 - x0, y1 - y0)
}

fn visible_span(rect: Rect, clip: Option<Rect>, size: PixelSize) -> Option<(u32, u32, u32, u32)> {
    let (mut x0, mut y0, mut x1, mut y1) = rect.pixel_span(size.width, size.height)?;
    if let Some(clip) = clip {
        let (cx0, cy0, cx1, cy1) = center_rect(clip).pixel_span(size.width, size.height)?;
        x0 = x0.max(cx0);
        y0 = y0.max(cy0);
        x1 = x1.min(cx1);
        y1 = y1.min(cy1);
    }
    if x0 >= x1 || y0 >= y1 { None } else { Some((x0, y0, x1, y1)) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::ContextBinding;
    use crate::scene::{Border, DrawList, ZIndex};

    fn pixel(tex: &Texture, x: u32, y: u32) -> [u8; 4] {
        let px = tex.host_pixels().unwrap();
        let i = ((y * tex.width() + x) * 4) as usize;
        [px[i], px[i + 1], px[i + 2], px[i + 3]]
    }

    fn render(list: &mut DrawList, frame: Option<&Texture>, size: PixelSize) -> Texture {
        let ctx = ContextBinding::software();
        let cx = ctx.make_current().unwrap();
        let mut backend = SoftwareBackend::new(&cx);
        backend
            .render(&cx, RenderPass { draw_list: list, frame, size, clear: Color::TRANSPARENT })
            .unwrap()
    }

    fn red_quad(rect: Rect, radius: f32) -> DrawCmd {
        DrawCmd::Quad(QuadCmd { rect, color: Color::from_premul(1.0, 0.0, 0.0, 1.0), radius, border: None })
    }

    #[test]
    fn empty_list_is_cleared() {
        let tex = render(&mut DrawList::new(), None, PixelSize::new(3, 2));
        assert_eq!(tex.size(), PixelSize::new(3, 2));
        assert!(tex.host_pixels().unwrap().iter().all(|&b| b == 0));
    }

    #[test]
    fn axis_aligned_quad_fills_exact_pixels() {
        let mut list = DrawList::new();
        list.push(ZIndex(0), red_quad(Rect::new(1.0, 1.0, 2.0, 2.0), 0.0));
        let tex = render(&mut list, None, PixelSize::new(4, 4));
        assert_eq!(pixel(&tex, 1, 1), [255, 0, 0, 255]);
        assert_eq!(pixel(&tex, 2, 2), [255, 0, 0, 255]);
        assert_eq!(pixel(&tex, 0, 0), [0, 0, 0, 0]);
        assert_eq!(pixel(&tex, 3, 3), [0, 0, 0, 0]);
    }

    #[test]
    fn rounded_corners_are_cut() {
        let mut list = DrawList::new();
        list.push(ZIndex(0), red_quad(Rect::new(0.0, 0.0, 20.0, 20.0), 10.0));
        let tex = render(&mut list, None, PixelSize::new(20, 20));
        assert_eq!(pixel(&tex, 0, 0)[3], 0);
        assert_eq!(pixel(&tex, 10, 10), [255, 0, 0, 255]);
    }

    #[test]
    fn border_paints_edge_color() {
        let mut list = DrawList::new();
        list.push(
            ZIndex(0),
            DrawCmd::Quad(QuadCmd {
                rect: Rect::new(0.0, 0.0, 10.0, 10.0),
                color: Color::from_premul(1.0, 0.0, 0.0, 1.0),
                radius: 0.0,
                border: Some(Border { width: 2.0, color: Color::from_premul(0.0, 0.0, 1.0, 1.0) }),
            }),
        );
        let tex = render(&mut list, None, PixelSize::new(10, 10));
        assert_eq!(pixel(&tex, 0, 5), [0, 0, 255, 255]);
        assert_eq!(pixel(&tex, 5, 5), [255, 0, 0, 255]);
    }

    #[test]
    fn clip_limits_painting() {
        let mut list = DrawList::new();
        list.push_clip(Rect::new(0.0, 0.0, 2.0, 4.0));
        list.push(ZIndex(0), red_quad(Rect::new(0.0, 0.0, 4.0, 4.0), 0.0));
        list.pop_clip();
        let tex = render(&mut list, None, PixelSize::new(4, 4));
        assert_eq!(pixel(&tex, 1, 0), [255, 0, 0, 255]);
        assert_eq!(pixel(&tex, 2, 0), [0, 0, 0, 0]);
    }

    #[test]
    fn frame_is_sampled_and_scaled() {
        let ctx = ContextBinding::software();
        let cx = ctx.make_current().unwrap();
        // 2x1 frame: green | blue
        let frame = cx
            .upload_rgba(PixelSize::new(2, 1), &[0, 255, 0, 255, 0, 0, 255, 255])
            .unwrap();
        let mut list = DrawList::new();
        list.push(ZIndex(0), DrawCmd::Frame(FrameCmd { rect: Rect::new(0.0, 0.0, 4.0, 2.0), opacity: 1.0 }));
        let mut backend = SoftwareBackend::new(&cx);
        let tex = backend
            .render(&cx, RenderPass {
                draw_list: &mut list,
                frame: Some(&frame),
                size: PixelSize::new(4, 2),
                clear: Color::TRANSPARENT,
            })
            .unwrap();
        assert_eq!(pixel(&tex, 0, 1), [0, 255, 0, 255]);
        assert_eq!(pixel(&tex, 3, 0), [0, 0, 255, 255]);
    }

    #[test]
    fn frame_without_texture_stays_transparent() {
        let mut list = DrawList::new();
        list.push(ZIndex(0), DrawCmd::Frame(FrameCmd { rect: Rect::new(0.0, 0.0, 2.0, 2.0), opacity: 1.0 }));
        let tex = render(&mut list, None, PixelSize::new(2, 2));
        assert!(tex.host_pixels().unwrap().iter().all(|&b| b == 0));
    }

    #[test]
    fn oversized_target_fails() {
        let ctx = ContextBinding::software();
        let cx = ctx.make_current().unwrap();
        let mut backend = SoftwareBackend::new(&cx);
        let err = backend
            .render(&cx, RenderPass {
                draw_list: &mut DrawList::new(),
                frame: None,
                size: PixelSize::new(9000, 8),
                clear: Color::TRANSPARENT,
            })
            .unwrap_err();
        assert!(matches!(err, BackendError::TextureTooLarge { .. }));
    }

    #[test]
    fn sync_points_are_signaled_and_ordered() {
        let ctx = ContextBinding::software();
        let cx = ctx.make_current().unwrap();
        let mut backend = SoftwareBackend::new(&cx);
        let a = backend.sync_point(&cx);
        let b = backend.sync_point(&cx);
        assert!(a.is_signaled() && b.wait().is_ok());
        assert!(b.seq() > a.seq());
    }
}
