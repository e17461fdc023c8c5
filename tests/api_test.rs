//! HTTP API and poll-cycle behaviour against in-memory state.
//!
//! Run with: cargo test --test api_test

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use chrono::{Duration, TimeZone, Utc};
use sea_orm::DatabaseConnection;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

use solar_watch::alerts::{AlertFeed, AlertLevel};
use solar_watch::common::AppState;
use solar_watch::config::Config;
use solar_watch::detector::{PanelStatus, SoilingDetector};
use solar_watch::monitor::worker::{self, CycleOutcome};
use solar_watch::routes;
use solar_watch::store::{AnyBaselineStore, MemoryBaselineStore};
use solar_watch::telemetry::{Reading, TelemetryError, TelemetrySource};

fn state() -> AppState {
    state_with(Config {
        disable_rate_limiting: true,
        ..Config::default()
    })
}

fn state_with(config: Config) -> AppState {
    let alerts = Arc::new(AlertFeed::new(config.alert_feed_capacity));
    let detector = SoilingDetector::new(
        config.detector,
        AnyBaselineStore::Memory(MemoryBaselineStore::default()),
        alerts.clone(),
    );
    AppState::new(DatabaseConnection::Disconnected, config, detector, alerts)
}

fn reading(seq: i64, lux: f64, solar_current: f64, battery_voltage: f64) -> Reading {
    Reading {
        entry_id: seq,
        timestamp: Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap() + Duration::seconds(seq * 20),
        lux,
        horizontal_error: 1.0,
        vertical_error: 0.0,
        servo_x: 90.0,
        servo_y: 45.0,
        solar_voltage: 6.0,
        solar_current,
        battery_voltage,
        avg_ldr: Some(lux * 0.8),
        status: None,
    }
}

async fn send(state: &AppState, method: Method, uri: &str) -> (StatusCode, Value) {
    let response = routes::build_router(state.clone())
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, body)
}

/// Source that replays a fixed script; an empty slot means unavailable.
struct ScriptedSource {
    script: Mutex<VecDeque<Option<Reading>>>,
}

impl ScriptedSource {
    fn new(script: Vec<Option<Reading>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
        }
    }
}

impl TelemetrySource for ScriptedSource {
    async fn poll(&self) -> Result<Reading, TelemetryError> {
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .flatten()
            .ok_or(TelemetryError::NoData)
    }
}

#[tokio::test]
async fn nothing_to_show_before_first_poll() {
    let state = state();

    assert_eq!(send(&state, Method::GET, "/healthz").await.0, StatusCode::OK);
    assert_eq!(
        send(&state, Method::GET, "/readyz").await.0,
        StatusCode::SERVICE_UNAVAILABLE
    );
    assert_eq!(
        send(&state, Method::GET, "/api/live").await.0,
        StatusCode::SERVICE_UNAVAILABLE
    );
    assert_eq!(
        send(&state, Method::GET, "/api/baseline").await.0,
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        send(&state, Method::POST, "/api/baseline").await.0,
        StatusCode::SERVICE_UNAVAILABLE
    );

    let (status, body) = send(&state, Method::GET, "/api/performance").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["baseline"].is_null());
    assert_eq!(body["settings"]["lux_weight"], 0.6);
}

#[tokio::test]
async fn unavailable_source_skips_the_cycle() {
    let state = state();
    let source = ScriptedSource::new(vec![None]);

    assert_eq!(worker::poll_once(&state, &source).await, CycleOutcome::Skipped);
    assert!(state.live.read().await.reading.is_none());
    assert!(state.alerts.is_empty());
}

#[tokio::test]
async fn calibrate_then_detect_soiling() {
    let state = state();

    let outcome = worker::process_reading(&state, reading(1, 1000.0, 200.0, 3.9)).await;
    assert_eq!(
        outcome,
        CycleOutcome::Evaluated {
            status: PanelStatus::Indeterminate,
            new_reading: true
        }
    );

    let (status, body) = send(&state, Method::GET, "/api/live").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "indeterminate");
    assert!((body["power_watts"].as_f64().unwrap() - 1.2).abs() < 1e-9);
    assert_eq!(send(&state, Method::GET, "/readyz").await.0, StatusCode::OK);

    let (status, body) = send(&state, Method::POST, "/api/baseline").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["baseline"]["lux"], 1000.0);
    assert_eq!(body["evaluation"]["status"], "clean");

    let (status, body) = send(&state, Method::GET, "/api/baseline").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["solar_current"], 200.0);

    let outcome = worker::process_reading(&state, reading(2, 1000.0, 120.0, 3.9)).await;
    assert_eq!(
        outcome,
        CycleOutcome::Evaluated {
            status: PanelStatus::CleaningRequired,
            new_reading: true
        }
    );

    let (_, body) = send(&state, Method::GET, "/api/performance").await;
    assert_eq!(body["evaluation"]["status"], "cleaning_required");
    assert!((body["evaluation"]["performance_ratio"].as_f64().unwrap() - 60.0).abs() < 1e-6);

    let (status, body) = send(&state, Method::GET, "/api/alerts").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["capacity"], 10);
    assert_eq!(body["alerts"][0]["level"], "danger");
    assert!(
        body["alerts"][1]["message"]
            .as_str()
            .unwrap()
            .starts_with("Baseline set at")
    );
}

#[tokio::test]
async fn dim_calibration_is_refused() {
    let state = state();
    worker::process_reading(&state, reading(1, 60.0, 20.0, 3.9)).await;

    let (status, body) = send(&state, Method::POST, "/api/baseline").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("insufficient light"));

    assert_eq!(
        send(&state, Method::GET, "/api/baseline").await.0,
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn rule_alerts_fire_once_per_reading() {
    let state = state();
    let low_battery = reading(1, 800.0, 150.0, 3.2);

    worker::process_reading(&state, low_battery.clone()).await;
    let repeat = worker::process_reading(&state, low_battery).await;
    assert_eq!(
        repeat,
        CycleOutcome::Evaluated {
            status: PanelStatus::Indeterminate,
            new_reading: false
        }
    );

    let alerts = state.alerts.snapshot();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].level, AlertLevel::Warning);
    assert!(alerts[0].message.starts_with("Low battery voltage"));
}

#[tokio::test]
async fn unknown_sort_key_is_rejected() {
    let state = state();
    let (status, body) = send(&state, Method::GET, "/api/readings?sort=colour").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("colour"));

    let (status, body) = send(&state, Method::GET, "/api/readings?page=minus-one").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn readiness_survives_huge_poll_interval() {
    let state = state_with(Config {
        disable_rate_limiting: true,
        poll_interval_seconds: u64::MAX / 2,
        ..Config::default()
    });
    worker::process_reading(&state, reading(1, 1000.0, 200.0, 3.9)).await;

    assert_eq!(send(&state, Method::GET, "/readyz").await.0, StatusCode::OK);
}

#[tokio::test]
async fn calibration_refuses_stale_reading() {
    let state = state();
    worker::process_reading(&state, reading(1, 1000.0, 200.0, 3.9)).await;
    state.live.write().await.polled_at = Some(Utc::now() - Duration::hours(3));

    let (status, body) = send(&state, Method::POST, "/api/baseline").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].as_str().unwrap().contains("stale"));
    assert_eq!(
        send(&state, Method::GET, "/readyz").await.0,
        StatusCode::SERVICE_UNAVAILABLE
    );
    assert_eq!(
        send(&state, Method::GET, "/api/baseline").await.0,
        StatusCode::NOT_FOUND
    );
}
