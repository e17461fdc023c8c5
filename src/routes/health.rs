use axum::{extract::State, http::StatusCode};
use chrono::Utc;

use crate::common::AppState;

/// Liveness probe
///
/// Returns 200 OK if the process is serving requests.
#[utoipa::path(
    get,
    path = "/healthz",
    responses(
        (status = 200, description = "Service is running"),
    ),
    tag = "health"
)]
pub async fn healthz() -> StatusCode {
    StatusCode::OK
}

/// Readiness probe
///
/// Returns 200 once a reading has been polled within the last three poll
/// intervals, 503 otherwise.
#[utoipa::path(
    get,
    path = "/readyz",
    responses(
        (status = 200, description = "Telemetry is flowing"),
        (status = 503, description = "No recent telemetry"),
    ),
    tag = "health"
)]
pub async fn readyz(State(state): State<AppState>) -> StatusCode {
    let window = state.config.readiness_window();

    match state.live.read().await.polled_at {
        Some(at) if Utc::now() - at <= window => StatusCode::OK,
        _ => StatusCode::SERVICE_UNAVAILABLE,
    }
}
