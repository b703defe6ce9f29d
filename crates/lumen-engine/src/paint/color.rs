/// Premultiplied RGBA color, channels in `[0, 1]`.
///
/// Invariant: `r`, `g`, `b` are already multiplied by `a`.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Color {
    pub r: f32, // premultiplied
    pub g: f32, // premultiplied
    pub b: f32, // premultiplied
    pub a: f32,
}

impl Color {
    pub const TRANSPARENT: Self = Self::from_premul(0.0, 0.0, 0.0, 0.0);

    /// Creates a premultiplied color from straight bytes (`0`–`255`), as
    /// produced by `#rrggbbaa` literals.
    #[inline]
    pub fn from_srgb_u8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::from_straight(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0, a as f32 / 255.0)
    }

    #[inline]
    pub fn from_rgba8(rgba: [u8; 4]) -> Self {
        Self::from_srgb_u8(rgba[0], rgba[1], rgba[2], rgba[3])
    }

    #[inline]
    pub const fn from_premul(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Creates a premultiplied color from straight alpha components.
    #[inline]
    pub fn from_straight(r: f32, g: f32, b: f32, a: f32) -> Self {
        let a = a.clamp(0.0, 1.0);
        Self {
            r: r.clamp(0.0, 1.0) * a,
            g: g.clamp(0.0, 1.0) * a,
            b: b.clamp(0.0, 1.0) * a,
            a,
        }
    }

    /// Looks up a CSS-style color keyword (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        let rgba: [u8; 4] = match name.to_ascii_lowercase().as_str() {
            "transparent" => [0, 0, 0, 0],
            "black" => [0, 0, 0, 255],
            "white" => [255, 255, 255, 255],
            "red" => [255, 0, 0, 255],
            "green" => [0, 128, 0, 255],
            "lime" => [0, 255, 0, 255],
            "blue" => [0, 0, 255, 255],
            "yellow" => [255, 255, 0, 255],
            "cyan" => [0, 255, 255, 255],
            "magenta" => [255, 0, 255, 255],
            "orange" => [255, 165, 0, 255],
            "purple" => [128, 0, 128, 255],
            "gray" | "grey" => [128, 128, 128, 255],
            "darkgray" | "darkgrey" => [169, 169, 169, 255],
            "lightgray" | "lightgrey" => [211, 211, 211, 255],
            _ => return None,
        };
        Some(Self::from_rgba8(rgba))
    }

    /// Multiplies every channel by `opacity`; stays premultiplied.
    #[inline]
    pub fn scaled(self, opacity: f32) -> Self {
        let o = opacity.clamp(0.0, 1.0);
        Self::from_premul(self.r * o, self.g * o, self.b * o, self.a * o)
    }

    /// Linear interpolation in premultiplied space.
    #[inline]
    pub fn lerp(self, to: Color, t: f32) -> Self {
        let mix = |a: f32, b: f32| a + (b - a) * t;
        Self::from_premul(mix(self.r, to.r), mix(self.g, to.g), mix(self.b, to.b), mix(self.a, to.a))
    }

    #[inline]
    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Quantizes to premultiplied RGBA8 with round-to-nearest.
    #[inline]
    pub fn to_rgba8(self) -> [u8; 4] {
        let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0 + 0.5) as u8;
        [q(self.r), q(self.g), q(self.b), q(self.a)]
    }

    #[inline]
    pub fn is_transparent(self) -> bool {
        self.a <= 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn straight_bytes_are_premultiplied() {
        let c = Color::from_srgb_u8(255, 0, 0, 128);
        assert!((c.r - 128.0 / 255.0).abs() < 1e-6);
        assert_eq!(c.g, 0.0);
    }

    #[test]
    fn named_colors_case_insensitive() {
        assert_eq!(Color::from_name("Red"), Some(Color::from_premul(1.0, 0.0, 0.0, 1.0)));
        assert_eq!(Color::from_name("chartreuse-ish"), None);
    }

    #[test]
    fn lerp_midpoint() {
        let c = Color::from_premul(0.0, 0.0, 0.0, 1.0).lerp(Color::from_premul(1.0, 1.0, 1.0, 1.0), 0.5);
        assert_eq!(c.to_rgba8(), [128, 128, 128, 255]);
    }

    #[test]
    fn scaled_by_opacity() {
        assert_eq!(Color::from_premul(1.0, 0.0, 0.0, 1.0).scaled(0.5).to_rgba8(), [128, 0, 0, 128]);
    }
}
