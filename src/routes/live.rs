use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::common::AppState;
use crate::detector::{Baseline, DetectorSettings, EvaluationResult, PanelStatus};
use crate::error::{AppError, AppResult};
use crate::telemetry::Reading;

#[derive(Debug, Serialize, ToSchema)]
pub struct LiveResponse {
    pub reading: Reading,
    /// Panel output in watts
    pub power_watts: f64,
    pub status: PanelStatus,
    pub polled_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PerformanceResponse {
    pub baseline: Option<Baseline>,
    /// Breakdown for the latest reading, absent before the first poll
    pub evaluation: Option<EvaluationResult>,
    pub settings: DetectorSettings,
}

/// Latest reading with derived power and panel status
#[utoipa::path(
    get,
    path = "/api/live",
    responses(
        (status = 200, description = "Latest reading", body = LiveResponse),
        (status = 503, description = "No telemetry received yet"),
    ),
    tag = "live"
)]
pub async fn get_live(State(state): State<AppState>) -> AppResult<Json<LiveResponse>> {
    let live = state.live.read().await;

    let Some(reading) = live.reading.clone() else {
        return Err(AppError::ServiceUnavailable(
            "No telemetry received yet".to_string(),
        ));
    };

    Ok(Json(LiveResponse {
        power_watts: reading.power_watts(),
        status: live
            .evaluation
            .as_ref()
            .map_or(PanelStatus::Indeterminate, |e| e.status),
        reading,
        polled_at: live.polled_at,
    }))
}

/// Soiling evaluation breakdown for the latest reading
#[utoipa::path(
    get,
    path = "/api/performance",
    responses(
        (status = 200, description = "Baseline, thresholds and latest evaluation", body = PerformanceResponse),
    ),
    tag = "performance"
)]
pub async fn get_performance(State(state): State<AppState>) -> Json<PerformanceResponse> {
    let (baseline, settings) = {
        let detector = state.detector.lock().await;
        (detector.baseline().cloned(), *detector.settings())
    };

    Json(PerformanceResponse {
        baseline,
        evaluation: state.live.read().await.evaluation.clone(),
        settings,
    })
}
