//! Safety clamping of planner output.
//!
//! Every plan field that reaches hardware is bounded here against the
//! configured `SafetyLimits` before the corresponding actuation is issued.

use qkd_common::error::Result;
use qkd_common::types::DecoyProfile;
use qkd_common::{clamp, SafetyLimits};

/// Phase magnitudes at or below this deadband skip the calibration call.
pub const PHASE_DEADBAND_DEG: f64 = 0.1;

/// Bound a decoy profile to the configured mu range. The decoy mean photon
/// number is allowed down to a tenth of the signal floor; probabilities are
/// bounded to [0, 1].
pub fn clamp_decoys(decoys: &DecoyProfile, safety: &SafetyLimits) -> Result<DecoyProfile> {
    let mu = safety.mu_bounds();
    Ok(DecoyProfile {
        mu_signal: clamp(decoys.mu_signal, mu)?,
        mu_decoy: clamp(decoys.mu_decoy, (mu.0 / 10.0, mu.1))?,
        vac_prob: clamp(decoys.vac_prob, (0.0, 1.0))?,
        sig_prob: clamp(decoys.sig_prob, (0.0, 1.0))?,
        decoy_prob: clamp(decoys.decoy_prob, (0.0, 1.0))?,
    })
}

/// Bound a requested repetition rate to the configured range.
pub fn clamp_rep_rate(rep_rate_hz: f64, safety: &SafetyLimits) -> Result<f64> {
    clamp(rep_rate_hz, safety.rep_bounds())
}

/// Bound a requested AMZI phase excursion to the configured limit.
pub fn clamp_phase(phase_deg: f64, safety: &SafetyLimits) -> Result<f64> {
    clamp(
        phase_deg,
        (-safety.amzi_phase_deg_limit, safety.amzi_phase_deg_limit),
    )
}
