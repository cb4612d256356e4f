//! Typed clients for the controller and planner services.
//!
//! Each remote service is modeled as a capability trait with one production
//! (HTTP) implementation and one recording fake:
//! - Production code uses `HttpController` / `HttpPlanner` over reqwest,
//!   with per-endpoint TLS built from the configured PEM material.
//! - Test code uses `FakeController` / `FakePlanner`, which record every
//!   call so the control loop can be exercised without any network.

use std::collections::VecDeque;
use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;

use qkd_common::error::{BridgeError, Result};
use qkd_common::rpc::{
    Ack, Capabilities, CalibrateRequest, ConfigureRequest, ConfigureResponse, DecoyRequest,
    HelloRequest, HelloResponse, ShutterRequest, StartRequest, StatusResponse, StopRequest,
};
use qkd_common::types::{ClockModel, Plan, PlanRequest};

use crate::config::TlsConfig;

// ----------------------------------------------------------------------------
// Capability traits
// ----------------------------------------------------------------------------

/// Operations the bridge issues against the transceiver controller.
#[async_trait]
pub trait ControllerApi: Send + Sync {
    async fn configure(&self, request: &ConfigureRequest) -> Result<ConfigureResponse>;
    async fn start_qkd(&self, session_id: &str) -> Result<Ack>;
    async fn stop_qkd(&self, session_id: &str) -> Result<Ack>;
    async fn get_status(&self) -> Result<StatusResponse>;
    async fn set_decoy_profile(&self, request: &DecoyRequest) -> Result<Ack>;
    async fn shutter(&self, open: bool) -> Result<Ack>;
    async fn calibrate(&self, calibration_type: &str) -> Result<Ack>;
}

/// Operations the bridge issues against the planner service.
#[async_trait]
pub trait PlannerApi: Send + Sync {
    async fn hello(&self, request: &HelloRequest) -> Result<HelloResponse>;
    async fn describe(&self) -> Result<Capabilities>;
    async fn set_clock_model(&self, clock: &ClockModel) -> Result<Ack>;
    async fn plan_cycle(&self, request: &PlanRequest) -> Result<Plan>;
}

// ----------------------------------------------------------------------------
// HTTP transport
// ----------------------------------------------------------------------------

/// One HTTP channel to a remote service.
struct HttpChannel {
    client: reqwest::Client,
    base_url: String,
}

impl HttpChannel {
    fn open(name: &str, endpoint: &str, tls: &TlsConfig) -> Result<Self> {
        info!("connecting to {name} at {endpoint}");
        let client = build_client(tls)?;
        let base_url = if endpoint.contains("://") {
            endpoint.trim_end_matches('/').to_string()
        } else {
            let scheme = if tls.enable { "https" } else { "http" };
            format!("{scheme}://{endpoint}")
        };
        Ok(Self { client, base_url })
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| BridgeError::Rpc(format!("POST {url}: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(BridgeError::Rpc(format!("{url} returned {status}")));
        }
        response
            .json()
            .await
            .map_err(|e| BridgeError::Rpc(format!("failed to decode {url}: {e}")))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| BridgeError::Rpc(format!("GET {url}: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(BridgeError::Rpc(format!("{url} returned {status}")));
        }
        response
            .json()
            .await
            .map_err(|e| BridgeError::Rpc(format!("failed to decode {url}: {e}")))
    }
}

/// Build an HTTP client for one endpoint, honoring its TLS settings.
///
/// With TLS enabled, a missing CA file is a configuration error raised
/// before any request is issued.
fn build_client(tls: &TlsConfig) -> Result<reqwest::Client> {
    if !tls.enable {
        return reqwest::Client::builder()
            .build()
            .map_err(|e| BridgeError::Connection(format!("failed to build HTTP client: {e}")));
    }

    let ca_path = tls
        .ca
        .as_ref()
        .ok_or_else(|| BridgeError::Config("TLS enabled but no CA file configured".to_string()))?;
    if !ca_path.exists() {
        return Err(BridgeError::Config(format!(
            "TLS CA file missing: {}",
            ca_path.display()
        )));
    }
    let ca_pem = fs::read(ca_path)?;
    let ca = reqwest::Certificate::from_pem(&ca_pem)
        .map_err(|e| BridgeError::Config(format!("failed to parse CA certificate: {e}")))?;

    let mut builder = reqwest::Client::builder().add_root_certificate(ca);

    if let (Some(cert), Some(key)) = (&tls.cert, &tls.key) {
        let mut identity_pem = fs::read(cert)?;
        identity_pem.extend_from_slice(&fs::read(key)?);
        let identity = reqwest::Identity::from_pem(&identity_pem)
            .map_err(|e| BridgeError::Config(format!("failed to build client identity: {e}")))?;
        builder = builder.identity(identity);
    }

    builder
        .build()
        .map_err(|e| BridgeError::Connection(format!("failed to build TLS client: {e}")))
}

/// Production controller client.
pub struct HttpController {
    channel: HttpChannel,
}

impl HttpController {
    pub fn connect(endpoint: &str, tls: &TlsConfig) -> Result<Self> {
        Ok(Self {
            channel: HttpChannel::open("QCS controller", endpoint, tls)?,
        })
    }
}

#[async_trait]
impl ControllerApi for HttpController {
    async fn configure(&self, request: &ConfigureRequest) -> Result<ConfigureResponse> {
        self.channel.post_json("/v1/configure", request).await
    }

    async fn start_qkd(&self, session_id: &str) -> Result<Ack> {
        let request = StartRequest {
            session_id: session_id.to_string(),
        };
        self.channel.post_json("/v1/start", &request).await
    }

    async fn stop_qkd(&self, session_id: &str) -> Result<Ack> {
        let request = StopRequest {
            session_id: session_id.to_string(),
        };
        self.channel.post_json("/v1/stop", &request).await
    }

    async fn get_status(&self) -> Result<StatusResponse> {
        self.channel.get_json("/v1/status").await
    }

    async fn set_decoy_profile(&self, request: &DecoyRequest) -> Result<Ack> {
        self.channel.post_json("/v1/decoys", request).await
    }

    async fn shutter(&self, open: bool) -> Result<Ack> {
        let request = ShutterRequest { open };
        self.channel.post_json("/v1/shutter", &request).await
    }

    async fn calibrate(&self, calibration_type: &str) -> Result<Ack> {
        let request = CalibrateRequest {
            calibration_type: calibration_type.to_string(),
        };
        self.channel.post_json("/v1/calibrate", &request).await
    }
}

/// Production planner client.
pub struct HttpPlanner {
    channel: HttpChannel,
}

impl HttpPlanner {
    pub fn connect(endpoint: &str, tls: &TlsConfig) -> Result<Self> {
        Ok(Self {
            channel: HttpChannel::open("planner", endpoint, tls)?,
        })
    }
}

#[async_trait]
impl PlannerApi for HttpPlanner {
    async fn hello(&self, request: &HelloRequest) -> Result<HelloResponse> {
        self.channel.post_json("/v1/hello", request).await
    }

    async fn describe(&self) -> Result<Capabilities> {
        self.channel.get_json("/v1/describe").await
    }

    async fn set_clock_model(&self, clock: &ClockModel) -> Result<Ack> {
        self.channel.post_json("/v1/clock", clock).await
    }

    async fn plan_cycle(&self, request: &PlanRequest) -> Result<Plan> {
        self.channel.post_json("/v1/plan", request).await
    }
}

// ----------------------------------------------------------------------------
// Recording fakes (testing)
// ----------------------------------------------------------------------------

fn ack_ok() -> Ack {
    Ack {
        ok: true,
        msg: String::new(),
    }
}

/// Fake controller for deterministic loop tests.
///
/// Records every call as a string, assigns incrementing session ids, and
/// serves a queue of status snapshots. Clones share the recorded state.
#[derive(Clone, Default)]
pub struct FakeController {
    calls: Arc<Mutex<Vec<String>>>,
    statuses: Arc<Mutex<VecDeque<StatusResponse>>>,
    next_session: Arc<Mutex<u32>>,
    fail_shutter: Arc<AtomicBool>,
}

impl FakeController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a status snapshot for the next `get_status` call.
    pub fn push_status(&self, status: StatusResponse) {
        self.statuses.lock().unwrap().push_back(status);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Count recorded calls whose label starts with `prefix`.
    pub fn call_count(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    /// Make subsequent `shutter` calls fail.
    pub fn set_fail_shutter(&self, fail: bool) {
        self.fail_shutter.store(fail, Ordering::SeqCst);
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ControllerApi for FakeController {
    async fn configure(&self, request: &ConfigureRequest) -> Result<ConfigureResponse> {
        self.record(format!("configure:{:.3}MHz", request.symbol_rate_mhz));
        let mut next = self.next_session.lock().unwrap();
        *next += 1;
        Ok(ConfigureResponse {
            session_id: format!("sess-{}", *next),
        })
    }

    async fn start_qkd(&self, session_id: &str) -> Result<Ack> {
        self.record(format!("start_qkd:{session_id}"));
        Ok(ack_ok())
    }

    async fn stop_qkd(&self, session_id: &str) -> Result<Ack> {
        self.record(format!("stop_qkd:{session_id}"));
        Ok(ack_ok())
    }

    async fn get_status(&self) -> Result<StatusResponse> {
        self.record("get_status".to_string());
        Ok(self
            .statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default())
    }

    async fn set_decoy_profile(&self, request: &DecoyRequest) -> Result<Ack> {
        self.record(format!(
            "set_decoys:mu_sig={:.3},mu_dec={:.3},vac={:.3}",
            request.mu_signal, request.mu_decoy, request.vacuum_prob
        ));
        Ok(ack_ok())
    }

    async fn shutter(&self, open: bool) -> Result<Ack> {
        if self.fail_shutter.load(Ordering::SeqCst) {
            return Err(BridgeError::Rpc("shutter actuator offline".to_string()));
        }
        self.record(format!("shutter:open={open}"));
        Ok(ack_ok())
    }

    async fn calibrate(&self, calibration_type: &str) -> Result<Ack> {
        self.record(format!("calibrate:{calibration_type}"));
        Ok(ack_ok())
    }
}

/// Fake planner returning a configurable plan. Clones share state.
#[derive(Clone)]
pub struct FakePlanner {
    calls: Arc<Mutex<Vec<String>>>,
    plan: Arc<Mutex<Plan>>,
}

impl FakePlanner {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            plan: Arc::new(Mutex::new(Plan::default())),
        }
    }

    /// Set the plan returned by subsequent `plan_cycle` calls.
    pub fn set_plan(&self, plan: Plan) {
        *self.plan.lock().unwrap() = plan;
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

impl Default for FakePlanner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PlannerApi for FakePlanner {
    async fn hello(&self, request: &HelloRequest) -> Result<HelloResponse> {
        self.record(format!("hello:{}", request.plugin_name));
        Ok(HelloResponse {
            bridge_version: "any".to_string(),
            qcs_firmware: "unknown".to_string(),
            features: vec!["clock-align".to_string(), "domain-policy".to_string()],
        })
    }

    async fn describe(&self) -> Result<Capabilities> {
        self.record("describe".to_string());
        Ok(Capabilities {
            can_plan_tx_schedule: true,
            can_phase_dither: true,
            can_clock_align: true,
            can_domain_policy: true,
            requires_raw_counts: false,
        })
    }

    async fn set_clock_model(&self, clock: &ClockModel) -> Result<Ack> {
        self.record(format!("set_clock_model:fine={:.1}", clock.fine_hz));
        Ok(ack_ok())
    }

    async fn plan_cycle(&self, request: &PlanRequest) -> Result<Plan> {
        self.record(format!("plan_cycle:qber={:.2}", request.tel.qber_pct));
        Ok(self.plan.lock().unwrap().clone())
    }
}
