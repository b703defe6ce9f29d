//! Time-driven property animations.
//!
//! Values are computed from the render clock alone; there is no per-frame
//! state, so seeking or replaying a timestamp yields the same value.

use lumen_engine::paint::Color;
use lumen_engine::time::ClockTime;

use super::props::{NodeProps, Property};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Easing {
    Linear,
    InQuad,
    OutQuad,
    InOutQuad,
}

impl Easing {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "linear" => Some(Easing::Linear),
            "in_quad" => Some(Easing::InQuad),
            "out_quad" => Some(Easing::OutQuad),
            "in_out_quad" => Some(Easing::InOutQuad),
            _ => None,
        }
    }

    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::InQuad => t * t,
            Easing::OutQuad => t * (2.0 - t),
            Easing::InOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    -1.0 + (4.0 - 2.0 * t) * t
                }
            }
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Loops {
    Count(u32),
    Infinite,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum AnimatedValue {
    Number { from: f32, to: f32 },
    Color { from: Color, to: Color },
}

/// One animation bound to a property of its owning node.
#[derive(Debug, Clone, PartialEq)]
pub struct Animation {
    pub property: Property,
    pub value: AnimatedValue,
    pub duration: ClockTime,
    pub delay: ClockTime,
    pub loops: Loops,
    pub easing: Easing,
    /// Every other cycle runs backwards.
    pub alternate: bool,
}

impl Animation {
    /// Eased progress in `[0, 1]` at render time `t`.
    pub fn progress(&self, t: ClockTime) -> f32 {
        let Some(elapsed) = t.nseconds().checked_sub(self.delay.nseconds()) else {
            return self.easing.apply(0.0);
        };
        let duration = self.duration.nseconds();
        if duration == 0 {
            return self.easing.apply(self.end_progress());
        }

        let cycle = elapsed / duration;
        if matches!(self.loops, Loops::Count(n) if cycle >= u64::from(n.max(1))) {
            return self.easing.apply(self.end_progress());
        }

        let frac = (elapsed % duration) as f64 / duration as f64;
        let raw = if self.alternate && cycle % 2 == 1 { 1.0 - frac } else { frac };
        self.easing.apply(raw as f32)
    }

    /// `true` once a finite animation has settled on its final value.
    pub fn is_finished(&self, t: ClockTime) -> bool {
        match self.loops {
            Loops::Infinite => false,
            Loops::Count(n) => {
                let end = self
                    .delay
                    .nseconds()
                    .saturating_add(self.duration.nseconds().saturating_mul(u64::from(n.max(1))));
                t.nseconds() >= end
            }
        }
    }

    fn end_progress(&self) -> f32 {
        match self.loops {
            Loops::Count(n) if self.alternate && n.max(1) % 2 == 0 => 0.0,
            _ => 1.0,
        }
    }

    /// Writes the animated value at `t` into `props`.
    pub fn apply(&self, t: ClockTime, props: &mut NodeProps) {
        let p = self.progress(t);
        match self.value {
            AnimatedValue::Number { from, to } => {
                props.set_number(self.property, from + (to - from) * p);
            }
            AnimatedValue::Color { from, to } => {
                props.set_color(self.property, from.lerp(to, p));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anim(loops: Loops, alternate: bool) -> Animation {
        Animation {
            property: Property::X,
            value: AnimatedValue::Number { from: 0.0, to: 100.0 },
            duration: ClockTime::from_mseconds(1000),
            delay: ClockTime::from_mseconds(500),
            loops,
            easing: Easing::Linear,
            alternate,
        }
    }

    fn ms(v: u64) -> ClockTime {
        ClockTime::from_mseconds(v)
    }

    #[test]
    fn holds_start_value_during_delay() {
        assert_eq!(anim(Loops::Count(1), false).progress(ms(200)), 0.0);
    }

    #[test]
    fn linear_progress_and_finish() {
        let a = anim(Loops::Count(1), false);
        assert_eq!(a.progress(ms(1000)), 0.5);
        assert_eq!(a.progress(ms(5000)), 1.0);
        assert!(a.is_finished(ms(1500)));
        assert!(!a.is_finished(ms(1499)));
    }

    #[test]
    fn infinite_loops_wrap() {
        let a = anim(Loops::Infinite, false);
        assert_eq!(a.progress(ms(2750)), 0.25);
        assert!(!a.is_finished(ms(1_000_000)));
    }

    #[test]
    fn alternate_runs_backwards_on_odd_cycles() {
        let a = anim(Loops::Count(2), true);
        assert_eq!(a.progress(ms(1750)), 0.75);
        assert_eq!(a.progress(ms(10_000)), 0.0);
    }

    #[test]
    fn huge_delay_never_finishes_early() {
        let mut a = anim(Loops::Count(3), false);
        a.delay = ClockTime::from_nseconds(u64::MAX);
        assert!(!a.is_finished(ms(10_000)));
        assert!(a.is_finished(ClockTime::from_nseconds(u64::MAX)));
        assert_eq!(a.progress(ms(10_000)), 0.0);
    }

    #[test]
    fn easing_curves() {
        assert_eq!(Easing::InQuad.apply(0.5), 0.25);
        assert_eq!(Easing::OutQuad.apply(0.5), 0.75);
        assert_eq!(Easing::InOutQuad.apply(0.25), 0.125);
        assert_eq!(Easing::InOutQuad.apply(1.0), 1.0);
    }

    #[test]
    fn zero_duration_jumps_to_end() {
        let mut a = anim(Loops::Count(1), false);
        a.duration = ClockTime::ZERO;
        assert_eq!(a.progress(ms(600)), 1.0);
    }

    #[test]
    fn apply_writes_color() {
        let mut props = NodeProps::default();
        let a = Animation {
            property: Property::Color,
            value: AnimatedValue::Color {
                from: Color::from_premul(0.0, 0.0, 0.0, 1.0),
                to: Color::from_premul(1.0, 1.0, 1.0, 1.0),
            },
            duration: ms(100),
            delay: ClockTime::ZERO,
            loops: Loops::Count(1),
            easing: Easing::Linear,
            alternate: false,
        };
        a.apply(ms(50), &mut props);
        assert_eq!(props.color, Color::from_premul(0.5, 0.5, 0.5, 1.0));
    }
}
