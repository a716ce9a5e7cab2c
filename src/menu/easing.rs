//! Easing curves for menu tweens, named the way GSAP names them.

use std::f64::consts::PI;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Easing {
    Linear,
    /// Overshoots the target by an amount controlled by the factor.
    BackOut(f64),
    Power3In,
    SineInOut,
}

pub const DEFAULT_BACK_OVERSHOOT: f64 = 1.70158;

impl Default for Easing {
    fn default() -> Self {
        Self::BackOut(1.7)
    }
}

impl Easing {
    /// Map progress `t ∈ [0, 1]` to eased progress. `BackOut` leaves the
    /// unit interval in the middle of the curve; endpoints are exact.
    pub fn apply(&self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match *self {
            Self::Linear => t,
            Self::BackOut(s) => {
                let u = t - 1.0;
                1.0 + (s + 1.0) * u * u * u + s * u * u
            }
            Self::Power3In => t * t * t,
            Self::SineInOut => -((PI * t).cos() - 1.0) / 2.0,
        }
    }

    /// Parse `"back.out(1.7)"`, `"power3.in"`, `"sine.inOut"`, `"none"`.
    /// Unknown names fall back to the default overshoot curve.
    pub fn parse(name: &str) -> Self {
        let name = name.trim();
        if let Some(rest) = name.strip_prefix("back.out") {
            let factor = rest
                .trim_start_matches('(')
                .trim_end_matches(')')
                .trim()
                .parse()
                .unwrap_or(DEFAULT_BACK_OVERSHOOT);
            return Self::BackOut(factor);
        }
        match name {
            "none" | "linear" => Self::Linear,
            "power3.in" | "cubic.in" => Self::Power3In,
            "sine.inOut" | "sine.inout" => Self::SineInOut,
            _ => Self::default(),
        }
    }
}
