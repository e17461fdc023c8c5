pub mod alerts;
pub mod baseline;
pub mod cache;
pub mod health;
pub mod live;
mod rate_limit;
pub mod readings;

use axum::{
    routing::get,
    Router,
};
use std::sync::Arc;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};

use rate_limit::FallbackIpKeyExtractor;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::common::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::healthz,
        health::readyz,
        live::get_live,
        live::get_performance,
        baseline::get_baseline,
        baseline::set_baseline,
        alerts::list_alerts,
        readings::list_readings,
    ),
    components(
        schemas(
            crate::telemetry::Reading,
            crate::detector::Baseline,
            crate::detector::DetectorSettings,
            crate::detector::EvaluationResult,
            crate::detector::PanelStatus,
            crate::detector::IndeterminateReason,
            crate::alerts::Alert,
            crate::alerts::AlertLevel,
            live::LiveResponse,
            live::PerformanceResponse,
            baseline::CalibrationResponse,
            alerts::AlertsResponse,
            readings::ReadingRow,
            readings::ReadingsListResponse,
            readings::SortKey,
            readings::SortOrder,
        )
    ),
    tags(
        (name = "health", description = "Liveness and readiness probes"),
        (name = "live", description = "Latest telemetry"),
        (name = "performance", description = "Soiling detection"),
        (name = "baseline", description = "Calibration baseline"),
        (name = "alerts", description = "Alert feed"),
        (name = "readings", description = "Stored telemetry history"),
    ),
    info(
        title = "Solar Watch API",
        description = "Soiling detection and telemetry API for a ThingSpeak solar tracker",
        version = "0.1.0"
    )
)]
struct ApiDoc;

pub fn build_router(state: AppState) -> Router {
    let config = &state.config;

    let api_routes_base = Router::new()
        .route("/live", get(live::get_live))
        .route("/performance", get(live::get_performance))
        .route(
            "/baseline",
            get(baseline::get_baseline).post(baseline::set_baseline),
        )
        .route("/alerts", get(alerts::list_alerts))
        .route("/readings", get(readings::list_readings));

    let api_routes = if config.disable_rate_limiting {
        tracing::warn!("Rate limiting DISABLED");
        api_routes_base
    } else {
        tracing::info!(
            per_second = config.rate_limit_per_second,
            burst = config.rate_limit_burst,
            "Rate limiting configured"
        );

        let limiter = GovernorConfigBuilder::default()
            .key_extractor(FallbackIpKeyExtractor)
            .per_second(config.rate_limit_per_second)
            .burst_size(config.rate_limit_burst)
            .finish();

        match limiter {
            Some(limiter) => api_routes_base.layer(GovernorLayer {
                config: Arc::new(limiter),
            }),
            None => {
                tracing::error!("Invalid rate limit settings; serving without rate limiting");
                api_routes_base
            }
        }
    }
    .layer(RequestBodyLimitLayer::new(64 * 1024)); // nothing we accept is large

    // Probes (NO rate limiting)
    let health_routes = Router::new()
        .route("/healthz", get(health::healthz))
        .route("/readyz", get(health::readyz));

    // OpenAPI documentation
    let docs_routes = Router::new().merge(Scalar::with_url("/docs", ApiDoc::openapi()));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .merge(docs_routes)
        .layer(CompressionLayer::new())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
