//! Mock AgriShield device
//!
//! An axum server that answers the device's HTTP surface from in-memory
//! state. Every config POST is recorded, and switches reproduce the failure
//! modes seen on real units: writes that are acknowledged but never applied,
//! POSTs that start failing, a corrupt or missing data log.
//!
//! # Example
//!
//! ```rust,no_run
//! use agriprobe_testkit::mock::MockDevice;
//!
//! # async fn demo() -> std::io::Result<()> {
//! let device = MockDevice::new().ignore_config_writes().spawn().await?;
//! println!("serving on {}", device.base_url());
//! # Ok(())
//! # }
//! ```

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use parking_lot::RwLock;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::debug;

use crate::random::{PseudoGenerator, Thresholds};

/// Device id reported by the mock
pub const MOCK_DEVICE_ID: &str = "AS-001-237";

/// Crop profile the mock boots with
pub const DEFAULT_PROFILE: &str = "CORN_V1";

/// Boot-time device configuration
pub fn default_config() -> Value {
    json!({
        "crop_profile_id": DEFAULT_PROFILE,
        "sampling_interval_minutes": 15,
        "alert_thresholds": {
            "humidity_warning": 70,
            "humidity_critical": 85,
            "temperature_max": 35,
            "soil_moisture_min": 30,
            "soil_moisture_max": 70
        }
    })
}

/// A data log with `count` hourly records
pub fn sample_log(count: usize) -> Value {
    let records: Vec<Value> = (0..count)
        .map(|i| {
            json!({
                "timestamp": 1_718_000_000u64 + 3_600 * i as u64,
                "temperature_air": 24.5,
                "humidity_air": 68.0,
                "soil_moisture": 41,
                "alert_level": "GREEN"
            })
        })
        .collect();
    json!({
        "device_info": { "device_id": MOCK_DEVICE_ID, "firmware_version": "1.2.0" },
        "records": records
    })
}

#[derive(Debug, Clone)]
enum LogState {
    Missing,
    Present(Value),
    Malformed,
}

#[derive(Debug)]
struct DeviceState {
    health: Value,
    ping: Value,
    status: Option<Value>,
    log: LogState,
    config: Value,
    config_posts: Vec<Value>,
    ignore_config_writes: bool,
    fail_config_posts_from: Option<usize>,
    requests: usize,
    rng: PseudoGenerator,
    boot_timestamp: u64,
}

type SharedState = Arc<RwLock<DeviceState>>;

/// Builder for a mock device
#[derive(Debug)]
pub struct MockDevice {
    state: DeviceState,
}

impl Default for MockDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDevice {
    /// A healthy device on `CORN_V1` with a three-record log
    pub fn new() -> Self {
        Self {
            state: DeviceState {
                health: json!({
                    "status": "OK",
                    "uptime_ms": 123_456,
                    "firmware_version": "1.2.0"
                }),
                ping: json!({ "pong": true }),
                status: None,
                log: LogState::Present(sample_log(3)),
                config: default_config(),
                config_posts: Vec::new(),
                ignore_config_writes: false,
                fail_config_posts_from: None,
                requests: 0,
                rng: PseudoGenerator::new(42),
                boot_timestamp: 1_718_000_000,
            },
        }
    }

    /// Seed for generated telemetry
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.state.rng = PseudoGenerator::new(seed);
        self
    }

    pub fn with_health(mut self, body: Value) -> Self {
        self.state.health = body;
        self
    }

    pub fn with_ping(mut self, body: Value) -> Self {
        self.state.ping = body;
        self
    }

    /// Serve this body from `/status` instead of generated telemetry
    pub fn with_status(mut self, body: Value) -> Self {
        self.state.status = Some(body);
        self
    }

    pub fn with_config(mut self, body: Value) -> Self {
        self.state.config = body;
        self
    }

    /// Serve this log body, or 404 when `None`
    pub fn with_data_log(mut self, body: Option<Value>) -> Self {
        self.state.log = match body {
            Some(v) => LogState::Present(v),
            None => LogState::Missing,
        };
        self
    }

    /// Answer `/data/log` with 200 and a body that is not JSON
    pub fn with_malformed_data_log(mut self) -> Self {
        self.state.log = LogState::Malformed;
        self
    }

    /// Acknowledge config POSTs without storing them
    pub fn ignore_config_writes(mut self) -> Self {
        self.state.ignore_config_writes = true;
        self
    }

    /// Answer the `n`th config POST (1-based) and every later one with 500
    pub fn fail_config_posts_from(mut self, n: usize) -> Self {
        self.state.fail_config_posts_from = Some(n);
        self
    }

    /// Bind to an ephemeral local port and start serving
    pub async fn spawn(self) -> std::io::Result<MockDeviceHandle> {
        let state: SharedState = Arc::new(RwLock::new(self.state));
        let app = router(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        debug!(%addr, "Mock device listening");

        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(MockDeviceHandle {
            base_url: format!("http://{addr}"),
            state,
            task,
        })
    }
}

/// A running mock device; the server stops when the handle is dropped
#[derive(Debug)]
pub struct MockDeviceHandle {
    base_url: String,
    state: SharedState,
    task: JoinHandle<()>,
}

impl MockDeviceHandle {
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Every config POST body received, in order
    pub fn config_posts(&self) -> Vec<Value> {
        self.state.read().config_posts.clone()
    }

    /// Configuration the device currently holds
    pub fn current_config(&self) -> Value {
        self.state.read().config.clone()
    }

    /// Total requests served
    pub fn request_count(&self) -> usize {
        self.state.read().requests
    }

    /// Replace the stored configuration behind the harness's back
    pub fn set_config(&self, body: Value) {
        self.state.write().config = body;
    }
}

impl Drop for MockDeviceHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// URL of a local port with nothing listening on it
pub async fn unreachable_url() -> std::io::Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(format!("http://{addr}"))
}

fn router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/ping", get(ping_handler))
        .route("/status", get(status_handler))
        .route("/data/log", get(data_log_handler))
        .route("/config", get(config_handler).post(apply_config_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_handler(State(state): State<SharedState>) -> Json<Value> {
    let mut s = state.write();
    s.requests += 1;
    Json(s.health.clone())
}

async fn ping_handler(State(state): State<SharedState>) -> Json<Value> {
    let mut s = state.write();
    s.requests += 1;
    Json(s.ping.clone())
}

async fn status_handler(State(state): State<SharedState>) -> Json<Value> {
    let mut s = state.write();
    s.requests += 1;
    if let Some(body) = &s.status {
        return Json(body.clone());
    }

    let thresholds = thresholds_of(&s.config);
    let timestamp = s.boot_timestamp + s.requests as u64;
    Json(s.rng.status_body(MOCK_DEVICE_ID, timestamp, &thresholds))
}

async fn data_log_handler(State(state): State<SharedState>) -> Response {
    let mut s = state.write();
    s.requests += 1;
    match &s.log {
        LogState::Missing => (StatusCode::NOT_FOUND, "No data log").into_response(),
        LogState::Present(body) => Json(body.clone()).into_response(),
        LogState::Malformed => (StatusCode::OK, "{\"records\": [").into_response(),
    }
}

async fn config_handler(State(state): State<SharedState>) -> Json<Value> {
    let mut s = state.write();
    s.requests += 1;
    Json(s.config.clone())
}

async fn apply_config_handler(
    State(state): State<SharedState>,
    Json(body): Json<Value>,
) -> Response {
    let mut s = state.write();
    s.requests += 1;
    s.config_posts.push(body.clone());

    let post_number = s.config_posts.len();
    if s.fail_config_posts_from.is_some_and(|n| post_number >= n) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "status": "ERROR", "message": "flash write failed" })),
        )
            .into_response();
    }

    if !s.ignore_config_writes {
        s.config = body;
    }
    Json(json!({ "status": "CONFIG_APPLIED", "message": "Configuration saved" })).into_response()
}

fn thresholds_of(config: &Value) -> Thresholds {
    let t = &config["alert_thresholds"];
    let defaults = Thresholds::default();
    let get = |key: &str, fallback: f64| t[key].as_f64().unwrap_or(fallback);
    Thresholds {
        humidity_warning: get("humidity_warning", defaults.humidity_warning),
        humidity_critical: get("humidity_critical", defaults.humidity_critical),
        temperature_max: get("temperature_max", defaults.temperature_max),
        soil_moisture_min: get("soil_moisture_min", defaults.soil_moisture_min),
    }
}
