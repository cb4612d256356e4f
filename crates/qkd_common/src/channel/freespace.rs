//! Free-space optical channel approximations.
//!
//! Ground-to-space links usually run with millimetre beam waists at 850 nm
//! or 1550 nm over path lengths from test ranges to satellite uplinks; the
//! guards here trace validation failures back to implausible scenarios
//! rather than numerical edge cases.

use crate::error::{BridgeError, Result};

/// Default wind speed for the Hufnagel-Valley profile, m/s.
pub const HV5_WIND_MS: f64 = 21.0;

/// Default boundary-layer strength for the Hufnagel-Valley profile.
pub const HV5_A: f64 = 1.7e-14;

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

fn ensure_finite(value: f64, name: &str) -> Result<()> {
    if !value.is_finite() {
        return Err(BridgeError::InvalidArgument(format!("{name} must be finite")));
    }
    Ok(())
}

/// Rayleigh range for a Gaussian beam.
pub fn rayleigh_range(w0_m: f64, wavelength_m: f64) -> Result<f64> {
    ensure_positive(w0_m, "w0_m")?;
    ensure_positive(wavelength_m, "wavelength_m")?;
    Ok(std::f64::consts::PI * w0_m * w0_m / wavelength_m)
}

/// Beam radius at propagation distance `z_m` for a diffraction-limited beam.
///
/// `z_m` can legitimately be negative when analysing symmetric two-way
/// propagation about the beam waist.
pub fn beam_radius(w0_m: f64, wavelength_m: f64, z_m: f64) -> Result<f64> {
    ensure_finite(z_m, "z_m")?;
    let z_r = rayleigh_range(w0_m, wavelength_m)?;
    Ok(w0_m * (1.0 + (z_m / z_r).powi(2)).sqrt())
}

/// Diffraction-limited geometric loss captured by a circular receiver
/// aperture, in dB.
pub fn geometric_spreading_loss_db(
    w0_m: f64,
    wavelength_m: f64,
    z_m: f64,
    aperture_radius_m: f64,
) -> Result<f64> {
    ensure_positive(aperture_radius_m, "aperture_radius_m")?;
    ensure_finite(z_m, "z_m")?;
    let w = beam_radius(w0_m, wavelength_m, z_m)?;
    let capture = 1.0 - (-(aperture_radius_m * aperture_radius_m) / (2.0 * w * w)).exp();
    let capture = capture.clamp(1.0e-12, 1.0);
    Ok(-10.0 * capture.log10())
}

/// Hufnagel-Valley boundary-layer profile for the index structure constant.
pub fn hv5_cn2(h_m: f64, v_ms: f64, a: f64) -> Result<f64> {
    ensure_non_negative(h_m, "h_m")?;
    ensure_positive(v_ms, "v_ms")?;
    ensure_positive(a, "a")?;
    let boundary_layer = a * (-h_m / 100.0).exp();
    let turbulence =
        0.00594 * (v_ms / 27.0).powi(2) * 10.0_f64.powf(-5.0 * h_m) * (-h_m / 1000.0).exp();
    let mid_altitude = 2.7e-16 * (-h_m / 1500.0).exp();
    Ok(boundary_layer + turbulence + mid_altitude)
}

/// Weak-fluctuation (Rytov) scintillation index for a plane wave.
pub fn scintillation_index_weak(cn2: f64, k: f64, z_m: f64) -> Result<f64> {
    ensure_non_negative(cn2, "cn2")?;
    ensure_positive(k, "k")?;
    ensure_positive(z_m, "z_m")?;
    Ok(1.23 * cn2 * k.powf(7.0 / 6.0) * z_m.powf(11.0 / 6.0))
}

/// Derived sizing parameters for a Gaussian beam.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussianBeamSummary {
    pub rayleigh_range_m: f64,
    pub divergence_rad: f64,
}

/// Rayleigh range and far-field half-angle divergence for a Gaussian beam.
pub fn gaussian_beam_summary(w0_m: f64, wavelength_m: f64) -> Result<GaussianBeamSummary> {
    let rayleigh_range_m = rayleigh_range(w0_m, wavelength_m)?;
    let divergence_rad = wavelength_m / (std::f64::consts::PI * w0_m);
    Ok(GaussianBeamSummary {
        rayleigh_range_m,
        divergence_rad,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rayleigh_range() {
        let z_r = rayleigh_range(1.0e-3, 1.55e-6).unwrap();
        assert!(z_r > 1.0);
    }

    #[test]
    fn test_rayleigh_range_rejects_non_finite() {
        assert!(rayleigh_range(f64::NAN, 1.55e-6).is_err());
    }

    #[test]
    fn test_beam_radius_grows_with_distance() {
        let near = beam_radius(1.0e-3, 1.55e-6, 10.0).unwrap();
        let far = beam_radius(1.0e-3, 1.55e-6, 5000.0).unwrap();
        assert!(far > near);
    }

    #[test]
    fn test_geometric_spreading_loss_monotonic() {
        let narrow_loss = geometric_spreading_loss_db(1.0e-3, 1.55e-6, 500.0, 0.25).unwrap();
        let wide_loss = geometric_spreading_loss_db(2.0e-3, 1.55e-6, 500.0, 0.25).unwrap();
        assert!(wide_loss < narrow_loss);
    }

    #[test]
    fn test_hv5_cn2_rejects_negative_altitude() {
        assert!(hv5_cn2(-1.0, HV5_WIND_MS, HV5_A).is_err());
    }

    #[test]
    fn test_scintillation_index_scales_with_distance() {
        let short = scintillation_index_weak(1.0e-15, 4.0e6, 500.0).unwrap();
        let long = scintillation_index_weak(1.0e-15, 4.0e6, 2000.0).unwrap();
        assert!(long > short);
    }

    #[test]
    fn test_gaussian_beam_summary_matches_primitives() {
        let summary = gaussian_beam_summary(1.0e-3, 1.55e-6).unwrap();
        assert_relative_eq!(
            summary.rayleigh_range_m,
            rayleigh_range(1.0e-3, 1.55e-6).unwrap()
        );
        assert_relative_eq!(
            summary.divergence_rad,
            1.55e-6 / (std::f64::consts::PI * 1.0e-3)
        );
    }
}
