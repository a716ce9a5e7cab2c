//! Host-facing configuration for the lightning effect.

use serde::Deserialize;
use tracing::warn;

use crate::error::EffectError;
use crate::noise::{DESKTOP_OCTAVES, MOBILE_OCTAVES};

pub const DEFAULT_HUE: f32 = 142.0;

/// Viewports narrower than this (CSS px) run the effect in mobile mode.
pub const MOBILE_BREAKPOINT: f64 = 640.0;

/// Desktop vs. constrained target. Selects the noise octave count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Capability {
    #[default]
    Desktop,
    Mobile,
}

impl Capability {
    pub fn from_viewport_width(width: f64) -> Self {
        if width < MOBILE_BREAKPOINT {
            Self::Mobile
        } else {
            Self::Desktop
        }
    }

    pub fn octaves(self) -> u32 {
        match self {
            Self::Desktop => DESKTOP_OCTAVES,
            Self::Mobile => MOBILE_OCTAVES,
        }
    }
}

/// What to do when the browser hands the graphics context back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryPolicy {
    /// Reload the hosting page. Coarse, but never renders with stale state.
    #[default]
    ReloadPage,
    /// Recompile the program and reallocate buffers in place.
    Rebuild,
}

/// Per-instance effect parameters. Changes apply on the next frame.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EffectConfig {
    /// Degrees, wrapped into `[0, 360)`.
    pub hue: f32,
    pub x_offset: f32,
    pub y_offset: f32,
    pub speed: f32,
    pub intensity: f32,
    pub size: f32,
    /// Enables the secondary forking term.
    pub active: bool,
    pub recovery: RecoveryPolicy,
}

impl Default for EffectConfig {
    fn default() -> Self {
        Self {
            hue: DEFAULT_HUE,
            x_offset: 0.0,
            y_offset: 0.0,
            speed: 1.0,
            intensity: 1.0,
            size: 1.0,
            active: false,
            recovery: RecoveryPolicy::ReloadPage,
        }
    }
}

impl EffectConfig {
    /// Parse a (possibly partial) JSON object and sanitise it.
    pub fn from_json(json: &str) -> Result<Self, EffectError> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config.sanitized())
    }

    /// Coerce out-of-range values into something the shader can use.
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();

        if self.hue.is_finite() {
            self.hue = self.hue.rem_euclid(360.0);
        } else {
            warn!(hue = self.hue, "non-finite hue, using default");
            self.hue = defaults.hue;
        }

        self.x_offset = clamp_offset("x_offset", self.x_offset);
        self.y_offset = clamp_offset("y_offset", self.y_offset);
        self.speed = positive_or("speed", self.speed, defaults.speed);
        self.intensity = positive_or("intensity", self.intensity, defaults.intensity);
        self.size = positive_or("size", self.size, defaults.size);
        self
    }
}

fn clamp_offset(name: &str, value: f32) -> f32 {
    if !value.is_finite() {
        warn!(field = name, value, "non-finite offset, using 0");
        return 0.0;
    }
    let clamped = value.clamp(-1.0, 1.0);
    if clamped != value {
        warn!(field = name, value, "offset outside [-1, 1], clamped");
    }
    clamped
}

fn positive_or(name: &str, value: f32, fallback: f32) -> f32 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        warn!(field = name, value, fallback, "expected a positive value");
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_hero_accent() {
        let c = EffectConfig::default();
        assert_eq!(c.hue, 142.0);
        assert_eq!((c.speed, c.intensity, c.size), (1.0, 1.0, 1.0));
        assert!(!c.active);
        assert_eq!(c.recovery, RecoveryPolicy::ReloadPage);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let c = EffectConfig::from_json(r#"{"speed":1.1,"intensity":1.6,"active":true}"#).unwrap();
        assert_eq!(c.speed, 1.1);
        assert_eq!(c.intensity, 1.6);
        assert!(c.active);
        assert_eq!(c.hue, DEFAULT_HUE);
        assert_eq!(c.size, 1.0);
    }

    #[test]
    fn camel_case_offsets_and_policy() {
        let c =
            EffectConfig::from_json(r#"{"xOffset":0.25,"yOffset":-3,"recovery":"rebuild"}"#).unwrap();
        assert_eq!(c.x_offset, 0.25);
        assert_eq!(c.y_offset, -1.0);
        assert_eq!(c.recovery, RecoveryPolicy::Rebuild);
    }

    #[test]
    fn sanitize_wraps_hue_and_replaces_bad_scalars() {
        let c = EffectConfig {
            hue: -30.0,
            speed: 0.0,
            intensity: f32::NAN,
            size: -2.0,
            ..EffectConfig::default()
        }
        .sanitized();
        assert_eq!(c.hue, 330.0);
        assert_eq!((c.speed, c.intensity, c.size), (1.0, 1.0, 1.0));
    }

    #[test]
    fn malformed_json_is_config_error() {
        assert!(matches!(
            EffectConfig::from_json("{hue:"),
            Err(EffectError::Config(_))
        ));
    }

    #[test]
    fn capability_from_width() {
        assert_eq!(Capability::from_viewport_width(375.0), Capability::Mobile);
        assert_eq!(Capability::from_viewport_width(1024.0), Capability::Desktop);
        assert_eq!(Capability::Mobile.octaves(), MOBILE_OCTAVES);
        assert_eq!(Capability::Desktop.octaves(), DESKTOP_OCTAVES);
    }
}
