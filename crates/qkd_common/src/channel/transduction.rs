//! Minimal models for superconducting-optical transduction.

use crate::error::{BridgeError, Result};

fn ensure_non_negative(value: f64, name: &str) -> Result<()> {
    if !value.is_finite() {
        return Err(BridgeError::InvalidArgument(format!("{name} must be finite")));
    }
    if value < 0.0 {
        return Err(BridgeError::InvalidArgument(format!(
            "{name} must be non-negative"
        )));
    }
    Ok(())
}

fn ensure_positive(value: f64, name: &str) -> Result<()> {
    if !value.is_finite() {
        return Err(BridgeError::InvalidArgument(format!("{name} must be finite")));
    }
    if value <= 0.0 {
        return Err(BridgeError::InvalidArgument(format!(
            "{name} must be positive"
        )));
    }
    Ok(())
}

/// Single-photon cooperativity of an electro-optomechanical interface.
///
/// Values above ~1e3 often mean the rotating-wave approximation no longer
/// holds and a more complete model is required.
pub fn cooperativity(g: f64, kappa: f64, gamma: f64) -> Result<f64> {
    ensure_non_negative(g, "g")?;
    ensure_positive(kappa, "kappa")?;
    ensure_positive(gamma, "gamma")?;
    Ok(4.0 * g * g / (kappa * gamma))
}

/// Linearised on-resonance conversion efficiency, clamped to [0, 1].
pub fn conversion_efficiency_linearized(
    g: f64,
    kappa_e: f64,
    kappa_o: f64,
    gamma_m: f64,
) -> Result<f64> {
    ensure_non_negative(g, "g")?;
    ensure_non_negative(kappa_e, "kappa_e")?;
    ensure_non_negative(kappa_o, "kappa_o")?;
    ensure_positive(gamma_m, "gamma_m")?;
    let denominator = (kappa_e + kappa_o) * gamma_m;
    if denominator == 0.0 {
        return Ok(0.0);
    }
    let eta = 4.0 * g * g / denominator;
    Ok(eta.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cooperativity() {
        assert_eq!(cooperativity(1.0, 1.0, 1.0).unwrap(), 4.0);
    }

    #[test]
    fn test_cooperativity_rejects_negative_coupling() {
        assert!(cooperativity(-1.0, 1.0, 1.0).is_err());
    }

    #[test]
    fn test_conversion_efficiency_bounds() {
        let eta = conversion_efficiency_linearized(0.1, 1.0, 1.0, 0.5).unwrap();
        assert!((0.0..=1.0).contains(&eta));
    }

    #[test]
    fn test_conversion_efficiency_clamps_to_unity() {
        let eta = conversion_efficiency_linearized(100.0, 1.0, 1.0, 0.5).unwrap();
        assert_eq!(eta, 1.0);
    }

    #[test]
    fn test_conversion_efficiency_rejects_non_finite() {
        assert!(conversion_efficiency_linearized(f64::NAN, 1.0, 1.0, 0.5).is_err());
    }
}
