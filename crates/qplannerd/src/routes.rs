//! Planner RPC routes.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio_stream::StreamExt;
use tracing::{debug, info};

use qkd_common::rpc::{Ack, Capabilities, HelloRequest, HelloResponse};
use qkd_common::types::{ClockModel, Plan, PlanRequest, Telemetry};

use crate::planner;
use crate::server::AppState;

type AppStateArc = Arc<AppState>;

pub fn planner_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/v1/hello", post(hello))
        .route("/v1/describe", get(describe))
        .route("/v1/clock", post(set_clock_model))
        .route("/v1/plan", post(plan_cycle))
        .route("/v1/events", post(events))
}

async fn hello(Json(request): Json<HelloRequest>) -> Json<HelloResponse> {
    info!(
        "hello from bridge: {} v{} ({})",
        request.plugin_name, request.version, request.git_sha
    );
    Json(HelloResponse {
        bridge_version: "any".to_string(),
        qcs_firmware: "unknown".to_string(),
        features: vec!["clock-align".to_string(), "domain-policy".to_string()],
    })
}

async fn describe() -> Json<Capabilities> {
    Json(Capabilities {
        can_plan_tx_schedule: true,
        can_phase_dither: true,
        can_clock_align: true,
        can_domain_policy: true,
        requires_raw_counts: false,
    })
}

async fn set_clock_model(
    State(state): State<AppStateArc>,
    Json(model): Json<ClockModel>,
) -> Json<Ack> {
    debug!(fine_hz = model.fine_hz, coarse_ppb = model.coarse_ppb, "clock model updated");
    *state.clock.write().await = model;
    Json(Ack {
        ok: true,
        msg: "clock accepted".to_string(),
    })
}

async fn plan_cycle(State(state): State<AppStateArc>, Json(request): Json<PlanRequest>) -> Json<Plan> {
    let clock = *state.clock.read().await;
    let plan = planner::plan_cycle(&clock, &request.tel, &request.limits, &request.slo);
    debug!(rationale = %plan.rationale, "planned cycle");
    Json(plan)
}

/// Fire-and-forget telemetry sideband: a newline-delimited stream of
/// telemetry records, acknowledged once the stream closes.
async fn events(body: Body) -> Json<Ack> {
    let mut stream = body.into_data_stream();
    let mut buffer: Vec<u8> = Vec::new();
    let mut received = 0usize;

    while let Some(chunk) = stream.next().await {
        let Ok(chunk) = chunk else { break };
        buffer.extend_from_slice(&chunk);
        while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = buffer.drain(..=pos).collect();
            record_event(&line, &mut received);
        }
    }
    if !buffer.is_empty() {
        record_event(&buffer, &mut received);
    }

    debug!("event stream closed after {received} records");
    Json(Ack {
        ok: true,
        msg: "event stream closed".to_string(),
    })
}

fn record_event(line: &[u8], received: &mut usize) {
    if let Ok(telemetry) = serde_json::from_slice::<Telemetry>(line) {
        debug!(
            qber_pct = telemetry.qber_pct,
            site = %telemetry.site,
            "event stream update"
        );
        *received += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::router;
    use approx::assert_relative_eq;
    use axum::http::{header, Request, StatusCode};
    use qkd_common::types::{Domain, Slo, SloClass};
    use qkd_common::Constraints;
    use tower::ServiceExt;

    fn app() -> Router {
        router(Arc::new(AppState::new()))
    }

    fn json_request(uri: &str, body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    fn plan_request(loss: f64, qber: f64) -> PlanRequest {
        PlanRequest {
            clock: ClockModel::default(),
            tel: Telemetry {
                t_unix_ms: 0,
                qber_pct: qber,
                sifted_rate_cps: 0.0,
                secure_rate_bps: 0.0,
                jitter_ps: 0.0,
                atm_loss_db_per_km: loss,
                dark_cps: 0.0,
                det_eff: 0.0,
                temperature_c: 0.0,
                site: "lab".to_string(),
                active_domain: Domain::Fso,
                scintillation_idx: 0.0,
            },
            limits: Constraints {
                mu_min: 0.05,
                mu_max: 0.9,
                rep_rate_min_hz: 1.0e6,
                rep_rate_max_hz: 1.0e9,
                qber_hard_ceiling_pct: 8.0,
            },
            slo: Slo {
                class: SloClass::Urllc,
                jitter_ps_target: 50.0,
                key_rate_min_bps: 5.0e4,
            },
        }
    }

    async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_hello_reports_features() {
        let request = HelloRequest {
            plugin_name: "qkd-bridge".to_string(),
            version: "0.3.1".to_string(),
            git_sha: "local".to_string(),
        };
        let response = app()
            .oneshot(json_request("/v1/hello", serde_json::to_vec(&request).unwrap()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let hello: HelloResponse = body_json(response).await;
        assert!(hello.features.contains(&"domain-policy".to_string()));
    }

    #[tokio::test]
    async fn test_describe_reports_capabilities() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/v1/describe")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let caps: Capabilities = body_json(response).await;
        assert!(caps.can_plan_tx_schedule);
        assert!(caps.can_domain_policy);
        assert!(!caps.requires_raw_counts);
    }

    #[tokio::test]
    async fn test_plan_route_applies_the_tier_policy() {
        let response = app()
            .oneshot(json_request(
                "/v1/plan",
                serde_json::to_vec(&plan_request(15.0, 1.0)).unwrap(),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let plan: Plan = body_json(response).await;
        let tx = plan.tx.unwrap();
        assert_eq!(tx.rep_rate_hz, 5.0e7);
        assert_eq!(tx.decoys.unwrap().mu_signal, 0.40);
    }

    #[tokio::test]
    async fn test_plan_uses_the_last_pushed_clock_model() {
        let app = app();

        let clock = ClockModel {
            fine_hz: 1.0e-3,
            ..ClockModel::default()
        };
        let response = app
            .clone()
            .oneshot(json_request("/v1/clock", serde_json::to_vec(&clock).unwrap()))
            .await
            .unwrap();
        let ack: Ack = body_json(response).await;
        assert!(ack.ok);

        let response = app
            .oneshot(json_request(
                "/v1/plan",
                serde_json::to_vec(&plan_request(5.0, 1.0)).unwrap(),
            ))
            .await
            .unwrap();
        let plan: Plan = body_json(response).await;
        // (1e-3 / 1e8) * 1e12 = 10 ps from the stored clock, not the request's
        assert_relative_eq!(plan.tx.unwrap().gate_shift_ps, 10.0, max_relative = 1.0e-9);
    }

    #[tokio::test]
    async fn test_events_acks_when_the_stream_closes() {
        let telemetry = plan_request(5.0, 1.0).tel;
        let mut body = serde_json::to_vec(&telemetry).unwrap();
        body.push(b'\n');
        body.extend_from_slice(&serde_json::to_vec(&telemetry).unwrap());
        body.push(b'\n');

        let response = app()
            .oneshot(json_request("/v1/events", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let ack: Ack = body_json(response).await;
        assert!(ack.ok);
        assert_eq!(ack.msg, "event stream closed");
    }
}
