use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::common::AppState;
use crate::detector::{Baseline, EvaluationResult};
use crate::error::{AppError, AppResult};

#[derive(Debug, Serialize, ToSchema)]
pub struct CalibrationResponse {
    pub baseline: Baseline,
    /// The calibration reading evaluated against the new baseline
    pub evaluation: EvaluationResult,
}

/// Current calibration baseline
#[utoipa::path(
    get,
    path = "/api/baseline",
    responses(
        (status = 200, description = "Baseline is set", body = Baseline),
        (status = 404, description = "No baseline yet"),
    ),
    tag = "baseline"
)]
pub async fn get_baseline(State(state): State<AppState>) -> AppResult<Json<Baseline>> {
    state
        .detector
        .lock()
        .await
        .baseline()
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::NotFound("No baseline set".to_string()))
}

/// Calibrate from the latest reading
///
/// The panel should be clean and in good sunlight. Replaces any previous
/// baseline. Refused while telemetry is stale.
#[utoipa::path(
    post,
    path = "/api/baseline",
    responses(
        (status = 201, description = "Baseline stored", body = CalibrationResponse),
        (status = 422, description = "Too dark or too little current to calibrate"),
        (status = 503, description = "No recent telemetry"),
    ),
    tag = "baseline"
)]
pub async fn set_baseline(
    State(state): State<AppState>,
) -> AppResult<(StatusCode, Json<CalibrationResponse>)> {
    let (reading, polled_at) = {
        let live = state.live.read().await;
        (live.reading.clone(), live.polled_at)
    };

    let Some(reading) = reading else {
        return Err(AppError::ServiceUnavailable(
            "No telemetry received yet".to_string(),
        ));
    };

    let fresh = polled_at.is_some_and(|at| Utc::now() - at <= state.config.readiness_window());
    if !fresh {
        tracing::info!(
            entry_id = reading.entry_id,
            polled_at = ?polled_at,
            "Calibration refused: stale telemetry"
        );
        return Err(AppError::ServiceUnavailable(
            "Latest reading is stale; wait for the next poll".to_string(),
        ));
    }

    let (baseline, evaluation) = {
        let mut detector = state.detector.lock().await;
        let baseline = detector.set_baseline(&reading).await?;
        (baseline, detector.evaluate(&reading))
    };

    {
        let mut live = state.live.write().await;
        // A newer poll may have landed while we held the detector
        if live.reading.as_ref().map(|r| r.entry_id) == Some(reading.entry_id) {
            live.evaluation = Some(evaluation.clone());
        }
    }

    Ok((
        StatusCode::CREATED,
        Json(CalibrationResponse {
            baseline,
            evaluation,
        }),
    ))
}
