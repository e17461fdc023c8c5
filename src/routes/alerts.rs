use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::alerts::Alert;
use crate::common::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct AlertsResponse {
    /// Newest first
    pub alerts: Vec<Alert>,
    pub capacity: usize,
}

/// Recent alerts
#[utoipa::path(
    get,
    path = "/api/alerts",
    responses(
        (status = 200, description = "Alert feed", body = AlertsResponse),
    ),
    tag = "alerts"
)]
pub async fn list_alerts(State(state): State<AppState>) -> Json<AlertsResponse> {
    Json(AlertsResponse {
        alerts: state.alerts.snapshot(),
        capacity: state.alerts.capacity(),
    })
}
