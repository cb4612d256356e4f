//! Optical-fibre quantum channel models.
//!
//! Typical telecom spans sit around 0.17-0.22 dB/km in the 1550 nm low-loss
//! window; link budgets mix linear and dB representations, so converters are
//! provided alongside the loss and key-rate helpers.

use crate::error::{BridgeError, Result};

fn ensure_finite(value: f64, name: &str) -> Result<()> {
    if !value.is_finite() {
        return Err(BridgeError::InvalidArgument(format!("{name} must be finite")));
    }
    Ok(())
}

fn ensure_non_negative(value: f64, name: &str) -> Result<()> {
    ensure_finite(value, name)?;
    if value < 0.0 {
        return Err(BridgeError::InvalidArgument(format!(
            "{name} must be non-negative"
        )));
    }
    Ok(())
}

/// Total channel loss in dB for a fibre span.
pub fn fiber_loss_db(distance_km: f64, alpha_db_per_km: f64) -> Result<f64> {
    ensure_non_negative(distance_km, "distance_km")?;
    ensure_non_negative(alpha_db_per_km, "alpha_db_per_km")?;
    Ok(distance_km * alpha_db_per_km)
}

/// Launched optical power after attenuation has been applied.
pub fn power_out_dbm(power_in_dbm: f64, loss_db: f64) -> Result<f64> {
    ensure_finite(power_in_dbm, "power_in_dbm")?;
    ensure_finite(loss_db, "loss_db")?;
    Ok(power_in_dbm - loss_db)
}

/// Approximate pulse broadening from chromatic dispersion, in ps.
///
/// Assumes a constant dispersion parameter (ps/nm/km), a source spectral
/// width (nm) and a propagation distance (km).
pub fn dispersion_broadening(
    ps_nm_km: f64,
    spectral_width_nm: f64,
    distance_km: f64,
) -> Result<f64> {
    ensure_non_negative(ps_nm_km, "ps_nm_km")?;
    ensure_non_negative(spectral_width_nm, "spectral_width_nm")?;
    ensure_non_negative(distance_km, "distance_km")?;
    Ok(ps_nm_km * spectral_width_nm * distance_km)
}

/// Estimate a BB84 quantum-bit error rate from signal/dark counts.
///
/// Half of the dark counts are assumed to contribute errors. With no signal
/// the QBER saturates to 0.5, representing a random key.
pub fn qber_bb84(est_signal_counts: f64, dark_counts: f64) -> Result<f64> {
    ensure_non_negative(est_signal_counts, "est_signal_counts")?;
    ensure_non_negative(dark_counts, "dark_counts")?;
    if est_signal_counts == 0.0 && dark_counts == 0.0 {
        return Ok(0.0);
    }
    if est_signal_counts <= 0.0 {
        return Ok(0.5);
    }
    Ok(0.5 * dark_counts / (est_signal_counts + dark_counts))
}

/// Shannon binary entropy with guards for extreme probabilities.
fn binary_entropy(probability: f64) -> f64 {
    if probability <= 0.0 || probability >= 1.0 {
        return 0.0;
    }
    -probability * probability.log2() - (1.0 - probability) * (1.0 - probability).log2()
}

/// Asymptotic BB84 secret key rate with a simple binary-entropy penalty.
pub fn key_rate_bb84(signal_rate_hz: f64, qber: f64, sifting_factor: f64) -> Result<f64> {
    ensure_non_negative(signal_rate_hz, "signal_rate_hz")?;
    ensure_finite(qber, "qber")?;
    ensure_finite(sifting_factor, "sifting_factor")?;
    if !(0.0..=1.0).contains(&sifting_factor) {
        return Err(BridgeError::InvalidArgument(
            "sifting_factor must lie in [0, 1]".to_string(),
        ));
    }
    let q = qber.clamp(0.0, 0.5);
    let rate = sifting_factor * signal_rate_hz * (1.0 - 2.0 * binary_entropy(q));
    Ok(rate.max(0.0))
}

/// Convert attenuation in dB to a linear power transmission factor.
///
/// Negative `loss_db` values correspond to inline amplification and are
/// permitted.
pub fn loss_db_to_transmission(loss_db: f64) -> Result<f64> {
    ensure_finite(loss_db, "loss_db")?;
    Ok(10.0_f64.powf(-loss_db / 10.0))
}

/// Convert a linear power transmission factor to dB attenuation.
///
/// Zero is rejected to prevent `log10` singularities.
pub fn transmission_to_loss_db(transmission: f64) -> Result<f64> {
    if !transmission.is_finite() {
        return Err(BridgeError::InvalidArgument(
            "transmission must be finite".to_string(),
        ));
    }
    if transmission <= 0.0 || transmission > 1.0 {
        return Err(BridgeError::InvalidArgument(
            "transmission must lie in (0, 1]".to_string(),
        ));
    }
    Ok(-10.0 * transmission.log10())
}
