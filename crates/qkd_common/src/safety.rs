//! Hardware safety limits and numeric clamping.
//!
//! Every actuation the bridge issues goes through `clamp` against the
//! configured `SafetyLimits`. Inverted ranges are a configuration error and
//! are rejected when the limits are validated at load time, not per cycle.

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};

/// Clamp `value` to the inclusive `bounds` pair.
pub fn clamp(value: f64, bounds: (f64, f64)) -> Result<f64> {
    let (lo, hi) = bounds;
    if lo > hi {
        return Err(BridgeError::Config(format!(
            "invalid clamp bounds: ({lo}, {hi})"
        )));
    }
    Ok(value.max(lo).min(hi))
}

/// Hardware guard rails loaded once per process lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyLimits {
    /// Allowed mean photon number range for signal pulses.
    #[serde(default = "default_mu_range")]
    pub mu_range: (f64, f64),

    /// Allowed pulse repetition rate range in Hz. `(0, 0)` means unset.
    #[serde(default)]
    pub rep_rate_hz_range: (f64, f64),

    /// Maximum AMZI phase excursion the bridge may request, in degrees.
    #[serde(default)]
    pub amzi_phase_deg_limit: f64,

    /// QBER level at which the interlock parks the hardware.
    #[serde(default)]
    pub qber_hard_ceiling_pct: f64,

    /// Close the optical shutter on shutdown or fault.
    #[serde(default = "default_shutter_guard")]
    pub shutter_guard: bool,
}

fn default_mu_range() -> (f64, f64) {
    (0.0, 1.0)
}

fn default_shutter_guard() -> bool {
    true
}

impl Default for SafetyLimits {
    fn default() -> Self {
        Self {
            mu_range: default_mu_range(),
            rep_rate_hz_range: (0.0, 0.0),
            amzi_phase_deg_limit: 0.0,
            qber_hard_ceiling_pct: 0.0,
            shutter_guard: default_shutter_guard(),
        }
    }
}

impl SafetyLimits {
    /// Reject inverted ranges. Called once when the configuration is loaded.
    pub fn validate(&self) -> Result<()> {
        for (name, (lo, hi)) in [
            ("mu_range", self.mu_range),
            ("rep_rate_hz_range", self.rep_rate_hz_range),
        ] {
            if lo > hi {
                return Err(BridgeError::Config(format!(
                    "{name} is inverted: ({lo}, {hi})"
                )));
            }
        }
        Ok(())
    }

    pub fn mu_bounds(&self) -> (f64, f64) {
        self.mu_range
    }

    pub fn rep_bounds(&self) -> (f64, f64) {
        self.rep_rate_hz_range
    }

    /// Read-only view handed to the planner each cycle so it plans within
    /// bounds without being trusted to enforce them.
    pub fn constraints(&self) -> Constraints {
        Constraints {
            mu_min: self.mu_range.0,
            mu_max: self.mu_range.1,
            rep_rate_min_hz: self.rep_rate_hz_range.0,
            rep_rate_max_hz: self.rep_rate_hz_range.1,
            qber_hard_ceiling_pct: self.qber_hard_ceiling_pct,
        }
    }
}

/// Planning constraints derived from `SafetyLimits`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraints {
    pub mu_min: f64,
    pub mu_max: f64,
    pub rep_rate_min_hz: f64,
    pub rep_rate_max_hz: f64,
    pub qber_hard_ceiling_pct: f64,
}
