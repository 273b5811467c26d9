//! Core configuration for keyrig-core.

use serde::{Deserialize, Serialize};

/// Tolerances, timing and defaults for an editing session.
/// Every field has a default so hosts may pass a partial object.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Two keyframes closer than this (seconds) address the same key.
    pub time_tolerance: f64,
    /// Live/curve rotation difference (radians) above which a companion bone is auto-keyed.
    pub rotation_epsilon: f64,
    /// Decimal places kept on keyed, scrubbed and playback times.
    pub time_decimals: u32,
    /// Collapse window for gizmo drag updates.
    pub gizmo_debounce_ms: f64,

    pub default_animation_name: String,
    /// Seconds.
    pub default_duration: f64,

    /// Keyboard stepping (seconds).
    pub frame_step: f64,
    pub coarse_step: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            time_tolerance: 1e-4,
            rotation_epsilon: 1e-3,
            time_decimals: 4,
            gizmo_debounce_ms: 30.0,
            default_animation_name: "MyAnimation".to_string(),
            default_duration: 5.0,
            frame_step: 1.0 / 30.0,
            coarse_step: 0.1,
        }
    }
}

/// Round `t` to `decimals` places. Non-finite input becomes 0.
#[inline]
pub fn quantize_time(t: f64, decimals: u32) -> f64 {
    if !t.is_finite() {
        return 0.0;
    }
    let scale = 10f64.powi(decimals as i32);
    (t * scale).round() / scale
}

/// Positive remainder of `t` over `period`; 0 for a non-positive period.
#[inline]
pub fn wrap_time(t: f64, period: f64) -> f64 {
    if period <= 0.0 || !t.is_finite() {
        return 0.0;
    }
    t.rem_euclid(period)
}
