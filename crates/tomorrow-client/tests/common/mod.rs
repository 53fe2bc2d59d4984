use std::collections::{HashMap, VecDeque};
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use futures::StreamExt;
use serde_json::{Value, json};

use tomorrow_client::{ApiClient, ClientConfig};

/// One scripted response of `GET /api/analysis/stream`.
#[derive(Debug, Clone, Default)]
pub struct StreamScript {
    /// Payloads sent as SSE `data:` events, each after `gap`.
    pub frames: Vec<String>,
    pub gap: Duration,
    /// Keep the connection open after the frames. SSE responses send
    /// keep-alive comments meanwhile.
    pub hold_open: bool,
    /// Reply with this status instead of a stream.
    pub status: Option<StatusCode>,
    /// Write frames as newline-delimited JSON instead of SSE events.
    pub ndjson: bool,
    /// Abort the body with an error after the frames.
    pub reset: bool,
}

impl StreamScript {
    pub fn frames(frames: &[&str]) -> Self {
        Self {
            frames: frames.iter().map(|f| f.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn held_open(mut self) -> Self {
        self.hold_open = true;
        self
    }

    pub fn as_ndjson(mut self) -> Self {
        self.ndjson = true;
        self
    }

    pub fn then_reset(mut self) -> Self {
        self.reset = true;
        self
    }

    pub fn with_gap(mut self, gap: Duration) -> Self {
        self.gap = gap;
        self
    }

    pub fn failing(status: StatusCode) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

/// Scripted backend state shared with the handlers.
#[derive(Default)]
pub struct Backend {
    /// `None` answers 500.
    pub stats: Mutex<Option<Value>>,
    pub system_status: Mutex<Option<Value>>,
    pub cases: Mutex<Value>,
    /// Consumed front to back; the last entry repeats.
    pub scenarios: Mutex<VecDeque<Value>>,
    pub streams: Mutex<VecDeque<StreamScript>>,
    pub decisions: Mutex<Vec<String>>,
    pub weights: Mutex<Option<Value>>,
    pub deadline_queries: Mutex<Vec<HashMap<String, String>>>,
    pub stats_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
    pub scenario_calls: AtomicUsize,
    pub stream_opens: AtomicUsize,
    pub active_streams: Arc<AtomicUsize>,
}

impl Backend {
    pub fn set_stats(&self, value: Option<Value>) {
        *self.stats.lock().unwrap() = value;
    }

    pub fn set_system_status(&self, value: Option<Value>) {
        *self.system_status.lock().unwrap() = value;
    }

    pub fn push_stream(&self, script: StreamScript) {
        self.streams.lock().unwrap().push_back(script);
    }

    pub fn push_scenarios(&self, value: Value) {
        self.scenarios.lock().unwrap().push_back(value);
    }

    pub fn active_streams(&self) -> usize {
        self.active_streams.load(Ordering::SeqCst)
    }
}

/// Decrements the live stream count when the response body is dropped.
struct ConnectionGuard(Arc<AtomicUsize>);

impl ConnectionGuard {
    fn new(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct TestServer {
    pub addr: SocketAddr,
    pub backend: Arc<Backend>,
    _shutdown: tokio::task::JoinHandle<()>,
}

impl TestServer {
    pub async fn new() -> Self {
        let backend = Arc::new(Backend::default());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let app = router(Arc::clone(&backend));
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Give the server a moment to start accepting
        tokio::time::sleep(Duration::from_millis(20)).await;

        Self {
            addr,
            backend,
            _shutdown: handle,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn client(&self) -> ApiClient {
        client_for(&self.base_url())
    }
}

pub fn client_for(base_url: &str) -> ApiClient {
    let config = ClientConfig {
        api_base_url: base_url.to_string(),
        request_timeout_secs: 2,
        scenario_timeout_secs: 2,
        connect_timeout_secs: 1,
        ..ClientConfig::default()
    };
    ApiClient::new(&config).unwrap()
}

/// A base URL on which nothing is listening.
pub async fn dead_base_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

/// Poll `cond` until it holds or three seconds pass.
pub async fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
    while tokio::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    cond()
}

fn router(backend: Arc<Backend>) -> Router<()> {
    Router::new()
        .route("/api/dashboard/stats", get(dashboard_stats))
        .route("/api/system/status", get(system_status))
        .route("/api/cases", get(cases))
        .route("/api/cases/{id}", get(case_detail))
        .route("/api/cases/{id}/analyze", post(analyze_case))
        .route("/api/cases/{id}/generate-decision", post(generate_decision))
        .route("/api/deadlines", get(deadlines))
        .route("/api/demo/init", post(init_demo))
        .route("/api/performance", get(performance))
        .route("/api/scenarios", get(scenarios))
        .route("/api/scenarios/update-weights", post(update_weights))
        .route("/api/scenarios/{id}", get(scenario_detail))
        .route("/api/scenarios/{id}/{verdict}", post(decide_scenario))
        .route("/api/analysis/stream", get(analysis_stream))
        .with_state(backend)
}

fn json_or_500(value: Option<Value>) -> Response {
    match value {
        Some(value) => Json(value).into_response(),
        None => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

async fn dashboard_stats(State(b): State<Arc<Backend>>) -> Response {
    b.stats_calls.fetch_add(1, Ordering::SeqCst);
    json_or_500(b.stats.lock().unwrap().clone())
}

async fn system_status(State(b): State<Arc<Backend>>) -> Response {
    b.status_calls.fetch_add(1, Ordering::SeqCst);
    json_or_500(b.system_status.lock().unwrap().clone())
}

async fn cases(State(b): State<Arc<Backend>>) -> Json<Value> {
    Json(json!({ "cases": b.cases.lock().unwrap().clone() }))
}

async fn case_detail(Path(id): Path<String>) -> Response {
    if id == "missing" {
        return StatusCode::NOT_FOUND.into_response();
    }
    Json(json!({ "case_id": id, "status": "open" })).into_response()
}

async fn analyze_case(Path(id): Path<String>) -> Json<Value> {
    Json(json!({ "case_id": id, "status": "analyzed" }))
}

async fn generate_decision(
    Path(id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    Json(json!({
        "case_id": id,
        "decision_type": query.get("decision_type"),
        "compliance_checks": { "deadline": true, "parties": true }
    }))
}

async fn deadlines(
    State(b): State<Arc<Backend>>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    b.deadline_queries.lock().unwrap().push(query);
    Json(json!({
        "deadlines": [
            { "case_id": "SPR-2024-001", "case_type": "permit", "deadline": "2026-10-20",
              "days_left": 6, "priority": "high", "status": "open" }
        ]
    }))
}

async fn init_demo() -> Json<Value> {
    Json(json!({ "cases_added": 3, "skipped": false }))
}

async fn performance() -> Json<Value> {
    Json(json!({
        "total_cases": 5,
        "total_analyses": 3,
        "avg_analysis_time": 1.5,
        "avg_decision_generation_time": 0.8
    }))
}

async fn scenarios(State(b): State<Arc<Backend>>) -> Response {
    b.scenario_calls.fetch_add(1, Ordering::SeqCst);
    let mut script = b.scenarios.lock().unwrap();
    let next = if script.len() > 1 {
        script.pop_front()
    } else {
        script.front().cloned()
    };
    json_or_500(next)
}

async fn scenario_detail(Path(id): Path<String>) -> Json<Value> {
    Json(json!({ "scenario_id": id, "title": format!("Scenario {id}"), "horizon": "36M" }))
}

async fn decide_scenario(
    State(b): State<Arc<Backend>>,
    Path((id, verdict)): Path<(String, String)>,
) -> Response {
    if id == "broken" {
        return StatusCode::BAD_GATEWAY.into_response();
    }
    b.decisions.lock().unwrap().push(format!("{verdict}:{id}"));
    Json(json!({ "ok": true })).into_response()
}

async fn update_weights(State(b): State<Arc<Backend>>, Json(body): Json<Value>) -> Json<Value> {
    *b.weights.lock().unwrap() = Some(body);
    Json(json!({
        "scenarios": [ { "scenario_id": "reweighted" } ],
        "statistics": { "total": 1, "positive": 1, "negative": 0 }
    }))
}

async fn analysis_stream(State(b): State<Arc<Backend>>) -> Response {
    b.stream_opens.fetch_add(1, Ordering::SeqCst);
    let script = b.streams.lock().unwrap().pop_front().unwrap_or_default();
    if let Some(status) = script.status {
        return status.into_response();
    }

    let guard = ConnectionGuard::new(Arc::clone(&b.active_streams));
    let gap = script.gap;
    let held = script
        .hold_open
        .then(futures::stream::pending::<String>);
    let reset = script
        .reset
        .then(|| Err(io::Error::new(io::ErrorKind::ConnectionReset, "scripted reset")));
    let payloads = futures::stream::iter(script.frames)
        .then(move |frame| async move {
            if !gap.is_zero() {
                tokio::time::sleep(gap).await;
            }
            frame
        })
        .chain(futures::stream::iter(held).flatten())
        .map(Ok)
        // Let hyper flush the last frame before the scripted reset tears the connection down.
        .chain(futures::stream::iter(reset).then(|err| async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            err
        }));

    if script.ndjson {
        let body = payloads.map(move |frame: io::Result<String>| {
            let _guard = &guard;
            frame.map(|frame| format!("{frame}\n"))
        });
        return (
            [(header::CONTENT_TYPE, "application/x-ndjson")],
            Body::from_stream(body),
        )
            .into_response();
    }

    let events = payloads.map(move |frame: io::Result<String>| {
        let _guard = &guard;
        frame.map(|frame| SseEvent::default().data(frame))
    });
    // Keep-alive writes are what surface a client disconnect while held open.
    Sse::new(events)
        .keep_alive(KeepAlive::new().interval(Duration::from_millis(50)))
        .into_response()
}
