use std::ops::{Add, Mul, Sub};

/// 2D vector in pixels.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Self = Self::splat(0.0);

    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub const fn splat(v: f32) -> Self {
        Self { x: v, y: v }
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    #[inline]
    pub fn min_component(self) -> f32 {
        self.x.min(self.y)
    }

    #[inline]
    pub fn max_component(self) -> f32 {
        self.x.max(self.y)
    }

    #[inline]
    pub fn abs(self) -> Self {
        Self::new(self.x.abs(), self.y.abs())
    }

    /// Component-wise maximum.
    #[inline]
    pub fn max(self, other: Self) -> Self {
        Self::new(self.x.max(other.x), self.y.max(other.y))
    }

    #[inline]
    pub fn length(self) -> f32 {
        self.x.hypot(self.y)
    }

    /// Layout used by GPU vertex attributes.
    #[inline]
    pub const fn to_array(self) -> [f32; 2] {
        [self.x, self.y]
    }
}

impl From<[f32; 2]> for Vec2 {
    #[inline]
    fn from([x, y]: [f32; 2]) -> Self {
        Self::new(x, y)
    }
}

macro_rules! component_op {
    ($trait:ident, $method:ident, $op:tt) => {
        impl $trait for Vec2 {
            type Output = Vec2;

            #[inline]
            fn $method(self, rhs: Vec2) -> Vec2 {
                Vec2::new(self.x $op rhs.x, self.y $op rhs.y)
            }
        }

        impl $trait<f32> for Vec2 {
            type Output = Vec2;

            #[inline]
            fn $method(self, rhs: f32) -> Vec2 {
                Vec2::new(self.x $op rhs, self.y $op rhs)
            }
        }
    };
}

component_op!(Add, add, +);
component_op!(Sub, sub, -);
component_op!(Mul, mul, *);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_and_vector_ops() {
        let v = Vec2::new(3.0, -4.0);
        assert_eq!(v + Vec2::splat(1.0), Vec2::new(4.0, -3.0));
        assert_eq!(v - 1.0, Vec2::new(2.0, -5.0));
        assert_eq!(v * 0.5, Vec2::new(1.5, -2.0));
        assert_eq!(v.abs().max(Vec2::splat(3.5)), Vec2::new(3.5, 4.0));
        assert_eq!(v.length(), 5.0);
        assert_eq!(Vec2::from(v.to_array()), v);
    }

    #[test]
    fn finiteness() {
        assert!(Vec2::ZERO.is_finite());
        assert!(!Vec2::new(f32::NAN, 0.0).is_finite());
        assert!(!Vec2::new(0.0, f32::INFINITY).is_finite());
    }
}
