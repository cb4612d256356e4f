//! Request/response bodies for the controller and planner services.

use serde::{Deserialize, Serialize};

/// Generic acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub ok: bool,
    pub msg: String,
}

// ----------------------------------------------------------------------------
// Controller service
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigureRequest {
    pub mode: String,
    pub wavelength_nm: f64,
    #[serde(rename = "symbol_rate_MHz")]
    pub symbol_rate_mhz: f64,
    pub divergence_urad: f64,
    pub use_spad: bool,
    pub ptp_enable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigureResponse {
    pub session_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartRequest {
    pub session_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopRequest {
    pub session_id: String,
}

/// Raw controller status snapshot. Every field is individually optional so
/// the bridge keeps working against partial or evolving controller schemas.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub qber_pct: Option<f64>,
    pub sifted_rate_cps: Option<f64>,
    pub secure_rate_cps: Option<f64>,
    pub jitter_ps: Option<f64>,
    pub atm_loss_db_per_km: Option<f64>,
    pub dark_counts_cps: Option<f64>,
    pub det_efficiency: Option<f64>,
    pub temperature_c: Option<f64>,
    pub site: Option<String>,
    pub scintillation_idx: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecoyRequest {
    pub session_id: String,
    pub mu_signal: f64,
    pub mu_decoy: f64,
    pub vacuum_prob: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShutterRequest {
    pub open: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrateRequest {
    #[serde(rename = "type")]
    pub calibration_type: String,
}

// ----------------------------------------------------------------------------
// Planner service
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelloRequest {
    pub plugin_name: String,
    pub version: String,
    pub git_sha: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelloResponse {
    pub bridge_version: String,
    pub qcs_firmware: String,
    pub features: Vec<String>,
}

/// Capability flags the planner advertises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub can_plan_tx_schedule: bool,
    pub can_phase_dither: bool,
    pub can_clock_align: bool,
    pub can_domain_policy: bool,
    pub requires_raw_counts: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_defaults_to_all_absent() {
        let status: StatusResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(status, StatusResponse::default());
        assert!(status.qber_pct.is_none());
        assert!(status.site.is_none());
    }

    #[test]
    fn test_configure_symbol_rate_wire_name() {
        let request = ConfigureRequest {
            mode: "BB84_TIME_BIN".to_string(),
            wavelength_nm: 1550.0,
            symbol_rate_mhz: 100.0,
            divergence_urad: 100.0,
            use_spad: false,
            ptp_enable: true,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"symbol_rate_MHz\":100.0"));
    }

    #[test]
    fn test_calibrate_type_wire_name() {
        let request = CalibrateRequest {
            calibration_type: "MZI_PHASE".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&request).unwrap(),
            "{\"type\":\"MZI_PHASE\"}"
        );
    }
}
