//! Telemetry translation.
//!
//! Maps a raw controller status snapshot into a fully populated `Telemetry`
//! record. Absent optional fields become zero-valued defaults ("unknown" for
//! the site) so the rest of the system never sees a partial schema. The
//! timestamp is stamped here, not sourced from the controller.

use chrono::Utc;

use qkd_common::rpc::StatusResponse;
use qkd_common::types::{Domain, Telemetry};

pub fn status_to_telemetry(status: &StatusResponse) -> Telemetry {
    Telemetry {
        t_unix_ms: Utc::now().timestamp_millis(),
        qber_pct: status.qber_pct.unwrap_or(0.0),
        sifted_rate_cps: status.sifted_rate_cps.unwrap_or(0.0),
        secure_rate_bps: status.secure_rate_cps.unwrap_or(0.0),
        jitter_ps: status.jitter_ps.unwrap_or(0.0),
        atm_loss_db_per_km: status.atm_loss_db_per_km.unwrap_or(0.0),
        dark_cps: status.dark_counts_cps.unwrap_or(0.0),
        det_eff: status.det_efficiency.unwrap_or(0.0),
        temperature_c: status.temperature_c.unwrap_or(0.0),
        site: status
            .site
            .clone()
            .unwrap_or_else(|| "unknown".to_string()),
        active_domain: Domain::Fso,
        scintillation_idx: status.scintillation_idx.unwrap_or(0.0),
    }
}
