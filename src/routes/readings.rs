use axum::{
    extract::{rejection::QueryRejection, Query, State},
    response::Response,
};
use sea_orm::{
    sea_query::Expr, EntityTrait, Order, PaginatorTrait, QueryOrder, QuerySelect,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::common::AppState;
use crate::entity::readings;
use crate::error::{AppError, AppResult};
use crate::routes::cache;
use crate::telemetry::Reading;

const MAX_PAGE_SIZE: u64 = 500;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Time,
    Lux,
    SolarVoltage,
    SolarCurrent,
    BatteryVoltage,
    Power,
}

impl SortKey {
    fn as_str(self) -> &'static str {
        match self {
            Self::Time => "time",
            Self::Lux => "lux",
            Self::SolarVoltage => "solar_voltage",
            Self::SolarCurrent => "solar_current",
            Self::BatteryVoltage => "battery_voltage",
            Self::Power => "power",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    fn order(self) -> Order {
        match self {
            Self::Asc => Order::Asc,
            Self::Desc => Order::Desc,
        }
    }
}

/// Query parameters for the readings table
#[derive(Debug, Deserialize, IntoParams)]
pub struct ReadingsQuery {
    /// Page number (1-indexed)
    #[serde(default = "default_page")]
    pub page: u64,
    /// Page size (max 500)
    #[serde(default = "default_page_size")]
    pub page_size: u64,
    /// Column to sort by
    #[serde(default)]
    #[param(inline)]
    pub sort: SortKey,
    /// Sort direction
    #[serde(default)]
    #[param(inline)]
    pub order: SortOrder,
}

fn default_page() -> u64 {
    1
}

fn default_page_size() -> u64 {
    20
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReadingRow {
    #[serde(flatten)]
    pub reading: Reading,
    pub power_watts: f64,
}

/// Paginated readings response
#[derive(Debug, Serialize, ToSchema)]
pub struct ReadingsListResponse {
    pub readings: Vec<ReadingRow>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
}

/// Stored readings, paginated and sortable
#[utoipa::path(
    get,
    path = "/api/readings",
    params(ReadingsQuery),
    responses(
        (status = 200, description = "Readings page", body = ReadingsListResponse),
        (status = 400, description = "Unknown sort key or malformed query"),
    ),
    tag = "readings"
)]
pub async fn list_readings(
    State(state): State<AppState>,
    query: Result<Query<ReadingsQuery>, QueryRejection>,
) -> AppResult<Response> {
    let Query(query) = query.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    let page = query.page.max(1);
    let page_size = query.page_size.clamp(1, MAX_PAGE_SIZE);

    let cache_key = cache::cache_key(
        "readings",
        &[
            &page.to_string(),
            &page_size.to_string(),
            query.sort.as_str(),
            query.order.as_str(),
        ],
    );

    if let Some(cached) = cache::get_cached(&state, &cache_key).await {
        return cache::json_response((*cached).clone(), true);
    }

    let latest = cache::get_latest_time(&state).await?;
    let total = readings::Entity::find().count(&state.db).await?;

    let select = readings::Entity::find();
    let select = match query.sort {
        SortKey::Time => select.order_by(readings::Column::Time, query.order.order()),
        SortKey::Lux => select.order_by(readings::Column::Lux, query.order.order()),
        SortKey::SolarVoltage => {
            select.order_by(readings::Column::SolarVoltage, query.order.order())
        }
        SortKey::SolarCurrent => {
            select.order_by(readings::Column::SolarCurrent, query.order.order())
        }
        SortKey::BatteryVoltage => {
            select.order_by(readings::Column::BatteryVoltage, query.order.order())
        }
        SortKey::Power => select.order_by(
            Expr::col(readings::Column::SolarVoltage).mul(Expr::col(readings::Column::SolarCurrent)),
            query.order.order(),
        ),
    };

    let rows = select
        // Tie-break so pages never overlap
        .order_by(readings::Column::EntryId, query.order.order())
        .offset((page - 1).saturating_mul(page_size))
        .limit(page_size)
        .all(&state.db)
        .await?;

    let response = ReadingsListResponse {
        readings: rows
            .into_iter()
            .map(|m| {
                let reading = Reading::from(m);
                ReadingRow {
                    power_watts: reading.power_watts(),
                    reading,
                }
            })
            .collect(),
        total,
        page,
        page_size,
    };

    tracing::debug!(
        page,
        page_size,
        sort = query.sort.as_str(),
        total,
        "Readings page computed"
    );

    cache::cache_and_respond(&state, cache_key, &response, latest).await
}
