//! Tiered planning heuristic.
//!
//! Pure function of (clock model, telemetry, constraints, SLO). The policy
//! is a data-driven tier table: harsher channels (higher atmospheric loss or
//! QBER) walk the repetition rate down and soften the decoy profile, and the
//! harshest tier nudges the preferred transport domain away from free-space
//! optics.

use qkd_common::types::{
    ClockModel, DecoyProfile, Domain, DomainPolicy, PhaseOverrides, Plan, Slo, Telemetry,
    TxOverrides,
};
use qkd_common::Constraints;

/// One degradation tier: triggered when loss OR qber exceed the thresholds.
struct TierPolicy {
    loss_over_db_per_km: f64,
    qber_over_pct: f64,
    rep_rate_divisor: f64,
    decoys: DecoyProfile,
}

const BASELINE_DECOYS: DecoyProfile = DecoyProfile {
    mu_signal: 0.50,
    mu_decoy: 0.08,
    vac_prob: 0.10,
    sig_prob: 0.75,
    decoy_prob: 0.15,
};

/// Tiers are evaluated in order; the second tier's thresholds are stricter,
/// so its rate divisor applies on top of the first tier's halving.
const DEGRADED_TIERS: [TierPolicy; 2] = [
    TierPolicy {
        loss_over_db_per_km: 10.0,
        qber_over_pct: 3.0,
        rep_rate_divisor: 2.0,
        decoys: DecoyProfile {
            mu_signal: 0.40,
            mu_decoy: 0.06,
            vac_prob: 0.15,
            sig_prob: 0.65,
            decoy_prob: 0.20,
        },
    },
    TierPolicy {
        loss_over_db_per_km: 20.0,
        qber_over_pct: 5.0,
        rep_rate_divisor: 4.0,
        decoys: DecoyProfile {
            mu_signal: 0.30,
            mu_decoy: 0.05,
            vac_prob: 0.20,
            sig_prob: 0.60,
            decoy_prob: 0.20,
        },
    },
];

/// Produce one cycle plan.
pub fn plan_cycle(clock: &ClockModel, tel: &Telemetry, limits: &Constraints, _slo: &Slo) -> Plan {
    // Start from the midpoint repetition rate unless the constraints are
    // degenerate, then walk it down when loss or QBER climb.
    let rep_floor = limits.rep_rate_min_hz.max(1.0e6);
    let rep_ceiling = if limits.rep_rate_max_hz > 0.0 {
        limits.rep_rate_max_hz
    } else {
        1.0e9
    };
    let mut rep_rate = rep_floor.max(1.0e8_f64.min(rep_ceiling));

    let mut decoys = BASELINE_DECOYS;
    let mut severity = 0;
    for (index, tier) in DEGRADED_TIERS.iter().enumerate() {
        if tel.atm_loss_db_per_km > tier.loss_over_db_per_km || tel.qber_pct > tier.qber_over_pct {
            rep_rate = rep_floor.max(rep_rate / tier.rep_rate_divisor);
            decoys = tier.decoys;
            severity = index + 1;
        }
    }

    // Convert fine frequency error to a gate shift, bounded to the guard
    // rails the bridge enforces.
    let gate_shift_ps = ((clock.fine_hz / rep_rate) * 1.0e12).clamp(-150.0, 150.0);

    // Mild phase dither during scintillation events to keep interference
    // visibility from collapsing.
    let mut phase_deg = 0.0;
    if tel.scintillation_idx > 0.3 {
        phase_deg = ((tel.scintillation_idx - 0.3) * 20.0).clamp(-8.0, 8.0);
    }

    // Cross-domain hint: nudge away from FSO when the fog proxy (loss or
    // QBER) indicates significant degradation.
    let preferred = if severity >= 2 {
        Domain::Mmwave
    } else {
        Domain::Fso
    };

    let rationale = format!(
        "loss={:.1}dB/km qber={:.2}% -> rep={:.0}MHz mu={:.2} shift={:.0}ps",
        tel.atm_loss_db_per_km,
        tel.qber_pct,
        rep_rate / 1.0e6,
        decoys.mu_signal,
        gate_shift_ps
    );

    Plan {
        tx: Some(TxOverrides {
            rep_rate_hz: rep_rate,
            pulse_width_ps: 100.0,
            decoys: Some(decoys),
            gate_shift_ps,
        }),
        phase: Some(PhaseOverrides {
            amzi_phase_deg: phase_deg,
            eom_bias_v_delta: 0.0,
        }),
        domain: Some(DomainPolicy {
            preferred,
            srv6_bsid: "FC00::A".to_string(),
            dscp: 46,
            mlo_prefer_6ghz: true,
        }),
        next_cycle_ms: 500,
        rationale,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use qkd_common::types::SloClass;

    fn telemetry(loss_db_per_km: f64, qber_pct: f64) -> Telemetry {
        Telemetry {
            t_unix_ms: 0,
            qber_pct,
            sifted_rate_cps: 0.0,
            secure_rate_bps: 0.0,
            jitter_ps: 0.0,
            atm_loss_db_per_km: loss_db_per_km,
            dark_cps: 0.0,
            det_eff: 0.0,
            temperature_c: 0.0,
            site: "lab".to_string(),
            active_domain: Domain::Fso,
            scintillation_idx: 0.0,
        }
    }

    fn limits() -> Constraints {
        Constraints {
            mu_min: 0.05,
            mu_max: 0.9,
            rep_rate_min_hz: 1.0e6,
            rep_rate_max_hz: 1.0e9,
            qber_hard_ceiling_pct: 8.0,
        }
    }

    fn slo() -> Slo {
        Slo {
            class: SloClass::Urllc,
            jitter_ps_target: 50.0,
            key_rate_min_bps: 5.0e4,
        }
    }

    fn plan_for(tel: &Telemetry) -> Plan {
        plan_cycle(&ClockModel::default(), tel, &limits(), &slo())
    }

    #[test]
    fn test_baseline_tier_for_clean_channel() {
        let plan = plan_for(&telemetry(5.0, 1.0));
        let tx = plan.tx.unwrap();
        let decoys = tx.decoys.unwrap();
        assert_eq!(tx.rep_rate_hz, 1.0e8);
        assert_eq!(decoys.mu_signal, 0.50);
        assert_eq!(decoys.mu_decoy, 0.08);
        assert_eq!(decoys.vac_prob, 0.10);
        assert_eq!(decoys.sig_prob, 0.75);
        assert_eq!(decoys.decoy_prob, 0.15);
        assert_eq!(plan.domain.unwrap().preferred, Domain::Fso);
    }

    #[test]
    fn test_tier_one_halves_rate_and_softens_decoys() {
        let plan = plan_for(&telemetry(15.0, 1.0));
        let tx = plan.tx.unwrap();
        let decoys = tx.decoys.unwrap();
        assert_eq!(tx.rep_rate_hz, 5.0e7);
        assert_eq!(decoys.mu_signal, 0.40);
        assert_eq!(decoys.mu_decoy, 0.06);
        assert_eq!(decoys.vac_prob, 0.15);
        assert_eq!(decoys.sig_prob, 0.65);
        assert_eq!(decoys.decoy_prob, 0.20);
        assert_eq!(plan.domain.unwrap().preferred, Domain::Fso);
    }

    #[test]
    fn test_tier_one_also_triggers_on_qber_alone() {
        let plan = plan_for(&telemetry(5.0, 3.5));
        let tx = plan.tx.unwrap();
        assert_eq!(tx.rep_rate_hz, 5.0e7);
        assert_eq!(tx.decoys.unwrap().mu_signal, 0.40);
    }

    #[test]
    fn test_tier_two_quarters_on_top_and_switches_domain() {
        let plan = plan_for(&telemetry(25.0, 6.0));
        let tx = plan.tx.unwrap();
        let decoys = tx.decoys.unwrap();
        // halved, then quartered: 1e8 / 8
        assert_eq!(tx.rep_rate_hz, 1.25e7);
        assert_eq!(decoys.mu_signal, 0.30);
        assert_eq!(decoys.mu_decoy, 0.05);
        assert_eq!(decoys.vac_prob, 0.20);
        assert_eq!(decoys.sig_prob, 0.60);
        assert_eq!(decoys.decoy_prob, 0.20);

        let domain = plan.domain.unwrap();
        assert_eq!(domain.preferred, Domain::Mmwave);
        assert_eq!(domain.dscp, 46);
        assert_eq!(domain.srv6_bsid, "FC00::A");
    }

    #[test]
    fn test_rate_steps_are_floor_clamped() {
        let mut limits = limits();
        limits.rep_rate_min_hz = 4.0e7;
        let plan = plan_cycle(
            &ClockModel::default(),
            &telemetry(25.0, 6.0),
            &limits,
            &slo(),
        );
        assert_eq!(plan.tx.unwrap().rep_rate_hz, 4.0e7);
    }

    #[test]
    fn test_unset_rate_bounds_fall_back_to_defaults() {
        let limits = Constraints {
            mu_min: 0.0,
            mu_max: 1.0,
            rep_rate_min_hz: 0.0,
            rep_rate_max_hz: 0.0,
            qber_hard_ceiling_pct: 0.0,
        };
        let plan = plan_cycle(
            &ClockModel::default(),
            &telemetry(5.0, 1.0),
            &limits,
            &slo(),
        );
        assert_eq!(plan.tx.unwrap().rep_rate_hz, 1.0e8);
    }

    #[test]
    fn test_gate_shift_tracks_fine_frequency_error() {
        let clock = ClockModel {
            fine_hz: 1.0e-3,
            ..ClockModel::default()
        };
        let plan = plan_cycle(&clock, &telemetry(5.0, 1.0), &limits(), &slo());
        // (1e-3 / 1e8) * 1e12 = 10 ps
        assert_relative_eq!(plan.tx.unwrap().gate_shift_ps, 10.0, max_relative = 1.0e-9);
    }

    #[test]
    fn test_gate_shift_is_bounded() {
        for fine_hz in [1.0e6, -1.0e6, 42.0, -42.0] {
            let clock = ClockModel {
                fine_hz,
                ..ClockModel::default()
            };
            let plan = plan_cycle(&clock, &telemetry(5.0, 1.0), &limits(), &slo());
            let shift = plan.tx.unwrap().gate_shift_ps;
            assert!((-150.0..=150.0).contains(&shift));
        }
    }

    #[test]
    fn test_no_phase_dither_below_scintillation_threshold() {
        let mut tel = telemetry(5.0, 1.0);
        tel.scintillation_idx = 0.3;
        let plan = plan_for(&tel);
        assert_eq!(plan.phase.unwrap().amzi_phase_deg, 0.0);
    }

    #[test]
    fn test_phase_dither_scales_then_saturates() {
        let mut tel = telemetry(5.0, 1.0);
        tel.scintillation_idx = 0.4;
        let plan = plan_for(&tel);
        assert_relative_eq!(plan.phase.unwrap().amzi_phase_deg, 2.0, max_relative = 1.0e-9);

        tel.scintillation_idx = 1.0;
        let plan = plan_for(&tel);
        assert_eq!(plan.phase.unwrap().amzi_phase_deg, 8.0);
    }

    #[test]
    fn test_plan_carries_rationale_and_fixed_cadence() {
        let plan = plan_for(&telemetry(15.0, 1.0));
        assert_eq!(plan.next_cycle_ms, 500);
        assert_eq!(plan.tx.as_ref().unwrap().pulse_width_ps, 100.0);
        assert!(plan.rationale.contains("loss=15.0dB/km"));
        assert!(plan.rationale.contains("rep=50MHz"));
    }
}
