//! Planner data model: telemetry, clock model, cycle plans.

use serde::{Deserialize, Serialize};

use crate::safety::Constraints;

/// Shared timing reference pushed to the planner before the loop starts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClockModel {
    pub coarse_ppb: f64,
    pub fine_hz: f64,
    pub tdc_bin_ps: f64,
    pub gate_ns: f64,
}

impl Default for ClockModel {
    fn default() -> Self {
        Self {
            coarse_ppb: 0.0,
            fine_hz: 0.0,
            tdc_bin_ps: 10.0,
            gate_ns: 1.0,
        }
    }
}

/// Transport domains a plan may prefer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Domain {
    Fso,
    Mmwave,
    Leo,
    Wifi7,
    Fr3_6g,
}

/// One normalized telemetry snapshot, produced fresh every cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Telemetry {
    pub t_unix_ms: i64,
    pub qber_pct: f64,
    pub sifted_rate_cps: f64,
    pub secure_rate_bps: f64,
    pub jitter_ps: f64,
    pub atm_loss_db_per_km: f64,
    pub dark_cps: f64,
    pub det_eff: f64,
    pub temperature_c: f64,
    pub site: String,
    pub active_domain: Domain,
    pub scintillation_idx: f64,
}

/// BB84 decoy-state parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecoyProfile {
    pub mu_signal: f64,
    pub mu_decoy: f64,
    pub vac_prob: f64,
    pub sig_prob: f64,
    pub decoy_prob: f64,
}

/// Transmitter-side overrides for one cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxOverrides {
    pub rep_rate_hz: f64,
    pub pulse_width_ps: f64,
    pub decoys: Option<DecoyProfile>,
    pub gate_shift_ps: f64,
}

/// Interferometer trims for one cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseOverrides {
    pub amzi_phase_deg: f64,
    pub eom_bias_v_delta: f64,
}

/// Advisory network-domain preference carried by a plan.
///
/// `dscp == 0` and an empty `srv6_bsid` mean "unset", mirroring the wire
/// defaults of the original protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainPolicy {
    pub preferred: Domain,
    pub srv6_bsid: String,
    pub dscp: u32,
    pub mlo_prefer_6ghz: bool,
}

/// One cycle plan. Produced once per cycle by the planner, consumed exactly
/// once by the safety clamp, then discarded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub tx: Option<TxOverrides>,
    pub phase: Option<PhaseOverrides>,
    pub domain: Option<DomainPolicy>,
    pub next_cycle_ms: u32,
    pub rationale: String,
}

impl Default for Plan {
    fn default() -> Self {
        Self {
            tx: None,
            phase: None,
            domain: None,
            next_cycle_ms: 500,
            rationale: String::new(),
        }
    }
}

/// Traffic class the planner optimizes toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SloClass {
    Urllc,
    Embb,
}

/// Service-level objective handed to the planner each cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slo {
    #[serde(rename = "cls")]
    pub class: SloClass,
    pub jitter_ps_target: f64,
    pub key_rate_min_bps: f64,
}

/// Full input to one planning call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanRequest {
    pub clock: ClockModel,
    pub tel: Telemetry,
    pub limits: Constraints,
    pub slo: Slo,
}
