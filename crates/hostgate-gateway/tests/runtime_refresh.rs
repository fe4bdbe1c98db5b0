//! Tokio host: real ticks and real control-plane calls.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod common;

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::get,
    Router,
};

use hostgate_core::error::Result;
use hostgate_gateway::filter::Action;
use hostgate_gateway::host::CallResponse;
use hostgate_gateway::obs::GatewayMetrics;
use hostgate_gateway::runtime::{
    spawn_instance, HttpCaller, InstanceSpec, OutboundCall, ReqwestCaller,
};

use common::{eventually, serve_stub, FakeStream};

#[derive(Clone, Default)]
struct ControlPlane {
    hits: Arc<AtomicUsize>,
    hosts: Arc<std::sync::Mutex<Vec<String>>>,
}

async fn domains(State(cp): State<ControlPlane>, headers: HeaderMap) -> (StatusCode, &'static str) {
    let n = cp.hits.fetch_add(1, Ordering::SeqCst);
    if let Some(h) = headers.get("host").and_then(|v| v.to_str().ok()) {
        cp.hosts.lock().unwrap().push(h.to_string());
    }
    match n {
        0 => (StatusCode::OK, r#"[{"name":"svc.example.com"}]"#),
        1 => (StatusCode::INTERNAL_SERVER_ERROR, "boom"),
        _ => (StatusCode::OK, r#"[{"name":"svc.example.com"},{"name":"api.example.com"}]"#),
    }
}

fn spec(filter: serde_json::Value, clusters: BTreeMap<String, String>, caller: Arc<dyn HttpCaller>) -> InstanceSpec {
    InstanceSpec {
        configuration: serde_json::to_vec(&filter).unwrap(),
        clusters: Arc::new(clusters),
        caller,
        metrics: Arc::new(GatewayMetrics::default()),
    }
}

#[tokio::test]
async fn instance_refreshes_from_control_plane() {
    let cp = ControlPlane::default();
    let addr = serve_stub(
        Router::new()
            .route("/domains", get(domains))
            .with_state(cp.clone()),
    )
    .await;

    let mut clusters = BTreeMap::new();
    clusters.insert("controlplane".to_string(), format!("http://{addr}"));
    let spec = spec(
        serde_json::json!({"api_host": "cp.internal", "refresh_interval_ms": 100}),
        clusters,
        Arc::new(ReqwestCaller::new().unwrap()),
    );
    let metrics = Arc::clone(&spec.metrics);

    let handle = spawn_instance(7, spec).unwrap();
    assert!(!handle.store().is_populated());

    let store = Arc::clone(handle.store());
    assert!(eventually(Duration::from_secs(5), || store.is_populated()).await);
    let mut stream = FakeStream::with_authority("svc.example.com");
    assert_eq!(handle.new_http_context().on_http_request_headers(&mut stream), Action::Continue);

    // The failing second response keeps the first snapshot; the third grows it.
    assert!(eventually(Duration::from_secs(5), || store.contains("api.example.com")).await);
    assert!(store.contains("svc.example.com"));
    assert!(metrics.refreshes.get(&[("instance", "7"), ("outcome", "response_error")]) >= 1);

    assert_eq!(cp.hosts.lock().unwrap().first().map(String::as_str), Some("cp.internal"));

    handle.shutdown();
    assert!(eventually(Duration::from_secs(2), || handle.is_finished()).await);
}

struct StalledCaller;

#[async_trait]
impl HttpCaller for StalledCaller {
    async fn call(&self, _base_url: &str, _call: OutboundCall) -> Result<CallResponse> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        unreachable!("call is cut off by the host timeout")
    }
}

#[tokio::test]
async fn stalled_call_times_out_and_store_stays_closed() {
    let spec = spec(
        serde_json::json!({
            "api_host": "cp.internal",
            "refresh_interval_ms": 100,
            "call_timeout_ms": 100,
        }),
        BTreeMap::new(),
        Arc::new(StalledCaller),
    );
    let metrics = Arc::clone(&spec.metrics);
    let handle = spawn_instance(0, spec).unwrap();

    let timed_out = eventually(Duration::from_secs(5), || {
        metrics.refreshes.get(&[("instance", "0"), ("outcome", "dispatch_error")]) >= 1
    })
    .await;
    assert!(timed_out);
    assert!(!handle.store().is_populated());

    handle.shutdown();
}

#[tokio::test]
async fn invalid_configuration_fails_start() {
    let spec = spec(
        serde_json::json!({"refresh_interval_ms": 100}),
        BTreeMap::new(),
        Arc::new(StalledCaller),
    );
    let err = spawn_instance(0, spec).err().expect("start must fail");
    assert_eq!(err.kind().as_str(), "CONFIG");
}
