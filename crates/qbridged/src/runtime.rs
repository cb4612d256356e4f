//! Closed-loop bridge runtime.
//!
//! Owns the process-wide mutable state (client handles, session id, running
//! flag) and sequences each tick: poll status, translate telemetry, enforce
//! the QBER interlock, request a plan, clamp it, apply it. The interlock is
//! a two-state machine (RUNNING / PARKED) with idempotent recovery: a tick
//! at or above the hard ceiling parks the hardware and skips planning, a
//! tick back below it reopens the shutter and restarts the session before a
//! plan is requested. Teardown runs on every exit path.

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use qkd_common::error::{BridgeError, Result};
use qkd_common::rpc::{ConfigureRequest, DecoyRequest, HelloRequest};
use qkd_common::types::{ClockModel, Plan, PlanRequest, Slo, SloClass};
use qkd_common::Constraints;

use crate::client::{ControllerApi, HttpController, HttpPlanner, PlannerApi};
use crate::config::BridgeConfig;
use crate::domain_policy::publish_domain_policy;
use crate::enforcer::{clamp_decoys, clamp_phase, clamp_rep_rate, PHASE_DEADBAND_DEG};
use crate::translator::status_to_telemetry;

/// Fixed service-level objective the bridge plans against.
pub fn default_slo() -> Slo {
    Slo {
        class: SloClass::Urllc,
        jitter_ps_target: 50.0,
        key_rate_min_bps: 5.0e4,
    }
}

/// Runs the closed-loop plan/apply cycle.
pub struct BridgeRuntime {
    config: BridgeConfig,
    controller: Option<Box<dyn ControllerApi>>,
    planner: Option<Box<dyn PlannerApi>>,
    session_id: Option<String>,
    running: bool,
}

impl BridgeRuntime {
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            config,
            controller: None,
            planner: None,
            session_id: None,
            running: false,
        }
    }

    /// Build a runtime around pre-constructed clients. Used by tests to
    /// drive the loop without any network.
    pub fn with_clients(
        config: BridgeConfig,
        controller: Box<dyn ControllerApi>,
        planner: Box<dyn PlannerApi>,
    ) -> Self {
        Self {
            config,
            controller: Some(controller),
            planner: Some(planner),
            session_id: None,
            running: false,
        }
    }

    /// Establish controller and planner channels.
    pub fn connect(&mut self) -> Result<()> {
        let controller = HttpController::connect(&self.config.qcs_endpoint, &self.config.qcs_tls)?;
        let planner = HttpPlanner::connect(&self.config.plugin_endpoint, &self.config.plugin_tls)?;
        self.controller = Some(Box::new(controller));
        self.planner = Some(Box::new(planner));
        Ok(())
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    fn controller(&self) -> Result<&dyn ControllerApi> {
        self.controller.as_deref().ok_or_else(|| {
            BridgeError::Precondition("controller client is not connected".to_string())
        })
    }

    fn planner(&self) -> Result<&dyn PlannerApi> {
        self.planner
            .as_deref()
            .ok_or_else(|| BridgeError::Precondition("planner client is not connected".to_string()))
    }

    fn session(&self) -> Result<&str> {
        self.session_id
            .as_deref()
            .ok_or_else(|| BridgeError::Precondition("no QKD session established".to_string()))
    }

    // ------------------------------------------------------------------
    // Session lifecycle
    // ------------------------------------------------------------------

    /// Configure the controller and start a QKD session. Idempotent: a held
    /// session id is returned unchanged.
    pub async fn ensure_session(&mut self) -> Result<String> {
        if let Some(id) = &self.session_id {
            return Ok(id.clone());
        }

        let symbol_rate_mhz = self.initial_symbol_rate_mhz();
        info!("issuing Configure request at {:.3} MHz", symbol_rate_mhz);
        let request = self.configure_request(symbol_rate_mhz);
        let response = self.controller()?.configure(&request).await?;
        let session_id = response.session_id;

        info!("starting QKD session {session_id}");
        self.controller()?.start_qkd(&session_id).await?;
        self.session_id = Some(session_id.clone());
        self.running = true;
        Ok(session_id)
    }

    /// Midpoint of the allowed repetition-rate range, in MHz.
    fn initial_symbol_rate_mhz(&self) -> f64 {
        let (lo, hi) = self.config.safety.rep_bounds();
        if hi <= 0.0 {
            return 100.0;
        }
        (lo + hi) / 2.0 / 1.0e6
    }

    fn configure_request(&self, symbol_rate_mhz: f64) -> ConfigureRequest {
        ConfigureRequest {
            mode: "BB84_TIME_BIN".to_string(),
            wavelength_nm: 1550.0,
            symbol_rate_mhz,
            divergence_urad: 100.0,
            use_spad: false,
            ptp_enable: true,
        }
    }

    // ------------------------------------------------------------------
    // Cycle
    // ------------------------------------------------------------------

    /// One control-loop tick, without the cycle sleep.
    pub async fn tick(&mut self, constraints: &Constraints, slo: &Slo) -> Result<()> {
        let status = self.controller()?.get_status().await?;
        let telemetry = status_to_telemetry(&status);
        debug!(
            qber_pct = telemetry.qber_pct,
            atm_loss_db_per_km = telemetry.atm_loss_db_per_km,
            "telemetry snapshot"
        );

        if telemetry.qber_pct >= self.config.safety.qber_hard_ceiling_pct {
            if self.running {
                warn!(
                    "QBER {:.2}% exceeds ceiling {:.2}% - parking shutter",
                    telemetry.qber_pct, self.config.safety.qber_hard_ceiling_pct
                );
                let session_id = self.session()?.to_string();
                self.controller()?.shutter(false).await?;
                self.controller()?.stop_qkd(&session_id).await?;
                self.running = false;
            }
            // Parked: no planning until telemetry recovers.
            return Ok(());
        }

        if !self.running {
            let session_id = self.session()?.to_string();
            info!("restarting QKD session {session_id}");
            self.controller()?.shutter(true).await?;
            self.controller()?.start_qkd(&session_id).await?;
            self.running = true;
        }

        let request = PlanRequest {
            clock: ClockModel::default(),
            tel: telemetry,
            limits: constraints.clone(),
            slo: slo.clone(),
        };
        let plan = self.planner()?.plan_cycle(&request).await?;
        debug!(rationale = %plan.rationale, "received plan");
        self.apply_plan(&plan, slo).await
    }

    /// Clamp a plan to the safety limits and issue the actuations.
    pub async fn apply_plan(&self, plan: &Plan, slo: &Slo) -> Result<()> {
        let session_id = self.session()?.to_string();

        if let Some(tx) = &plan.tx {
            if let Some(decoys) = &tx.decoys {
                let clamped = clamp_decoys(decoys, &self.config.safety)?;
                debug!(
                    mu_signal = clamped.mu_signal,
                    mu_decoy = clamped.mu_decoy,
                    vac_prob = clamped.vac_prob,
                    "applying decoy profile"
                );
                let request = DecoyRequest {
                    session_id: session_id.clone(),
                    mu_signal: clamped.mu_signal,
                    mu_decoy: clamped.mu_decoy,
                    vacuum_prob: clamped.vac_prob,
                };
                self.controller()?.set_decoy_profile(&request).await?;
            }

            if tx.rep_rate_hz != 0.0 {
                let rep_rate = clamp_rep_rate(tx.rep_rate_hz, &self.config.safety)?;
                let symbol_rate_mhz = rep_rate / 1.0e6;
                debug!("nudging symbol rate to {:.3} MHz", symbol_rate_mhz);
                let request = self.configure_request(symbol_rate_mhz);
                self.controller()?.configure(&request).await?;
            }
        }

        if let Some(phase) = &plan.phase {
            if phase.amzi_phase_deg.abs() > PHASE_DEADBAND_DEG {
                let phase_delta = clamp_phase(phase.amzi_phase_deg, &self.config.safety)?;
                debug!("requesting MZI phase calibration {:.2} deg", phase_delta);
                self.controller()?.calibrate("MZI_PHASE").await?;
            }
        }

        if let Some(domain) = &plan.domain {
            publish_domain_policy(domain, &self.config.mapping, slo.class);
        }

        Ok(())
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Run the control loop until interrupted or a call fails, then tear
    /// down. Teardown runs regardless of how the loop exits.
    pub async fn run(&mut self) -> Result<()> {
        if self.controller.is_none() || self.planner.is_none() {
            return Err(BridgeError::Precondition(
                "connect() must be called before run()".to_string(),
            ));
        }
        let result = self.drive().await;
        self.shutdown().await;
        result
    }

    async fn drive(&mut self) -> Result<()> {
        self.ensure_session().await?;

        debug!("pushing baseline clock model");
        self.planner()?
            .set_clock_model(&ClockModel::default())
            .await?;

        let hello_request = HelloRequest {
            plugin_name: "qkd-bridge".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            git_sha: "local".to_string(),
        };
        let hello = self.planner()?.hello(&hello_request).await?;
        info!(
            bridge_version = %hello.bridge_version,
            qcs_firmware = %hello.qcs_firmware,
            features = ?hello.features,
            "planner hello"
        );
        let caps = self.planner()?.describe().await?;
        info!(?caps, "planner capabilities");

        let constraints = self.config.safety.constraints();
        let slo = default_slo();
        let cycle_period = Duration::from_millis(self.config.cycle_period_ms);

        info!(
            "starting control loop (cycle={} ms, qber ceiling={:.2}%)",
            self.config.cycle_period_ms, self.config.safety.qber_hard_ceiling_pct
        );

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("bridge interrupted, stopping");
                    return Ok(());
                }
                result = self.cycle(&constraints, &slo, cycle_period) => result?,
            }
        }
    }

    async fn cycle(&mut self, constraints: &Constraints, slo: &Slo, period: Duration) -> Result<()> {
        self.tick(constraints, slo).await?;
        sleep(period).await;
        Ok(())
    }

    /// Termination sequence: stop a running session, close the shutter when
    /// the guard is enabled (best effort), drop both channels.
    pub async fn shutdown(&mut self) {
        if self.running {
            if let (Some(session_id), Some(controller)) =
                (self.session_id.clone(), self.controller.as_deref())
            {
                if let Err(err) = controller.stop_qkd(&session_id).await {
                    warn!("failed to stop session during shutdown: {err}");
                }
            }
            self.running = false;
        }

        if self.config.safety.shutter_guard {
            if let Some(controller) = self.controller.as_deref() {
                if let Err(err) = controller.shutter(false).await {
                    error!("failed to close shutter during shutdown: {err}");
                }
            }
        }

        let had_channels = self.controller.is_some() || self.planner.is_some();
        self.controller = None;
        self.planner = None;
        if had_channels {
            info!("bridge channels closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DomainMapping, TlsConfig};
    use qkd_common::SafetyLimits;

    fn config(rep_range: (f64, f64)) -> BridgeConfig {
        BridgeConfig {
            qcs_endpoint: "localhost:7600".to_string(),
            plugin_endpoint: "localhost:7700".to_string(),
            cycle_period_ms: 500,
            telemetry_period_ms: 250,
            qcs_tls: TlsConfig::default(),
            plugin_tls: TlsConfig::default(),
            safety: SafetyLimits {
                rep_rate_hz_range: rep_range,
                ..SafetyLimits::default()
            },
            mapping: DomainMapping::default(),
        }
    }

    #[test]
    fn test_initial_symbol_rate_is_range_midpoint() {
        let runtime = BridgeRuntime::new(config((1.0e6, 1.0e9)));
        let mid_mhz = (1.0e6 + 1.0e9) / 2.0 / 1.0e6;
        assert_eq!(runtime.initial_symbol_rate_mhz(), mid_mhz);
    }

    #[test]
    fn test_initial_symbol_rate_falls_back_when_unset() {
        let runtime = BridgeRuntime::new(config((0.0, 0.0)));
        assert_eq!(runtime.initial_symbol_rate_mhz(), 100.0);
    }

    #[test]
    fn test_default_slo_targets() {
        let slo = default_slo();
        assert_eq!(slo.class, SloClass::Urllc);
        assert_eq!(slo.jitter_ps_target, 50.0);
        assert_eq!(slo.key_rate_min_bps, 5.0e4);
    }
}
