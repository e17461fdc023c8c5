//! Response caching for the readings table.
//!
//! Pages of history are cached by query parameters. Each entry remembers the
//! newest reading time in the table when it was computed; a hit is only
//! served if no newer reading has been stored since, so a fresh poll is
//! visible on the next request while repeated page flips stay cheap.

use axum::{
    http::{header, HeaderValue},
    response::Response,
};
use chrono::{DateTime, Utc};
use sea_orm::{ConnectionTrait, FromQueryResult, Statement};
use serde::Serialize;
use std::sync::Arc;

use crate::common::{AppState, CachedResponse};
use crate::error::{AppError, AppResult};

#[derive(Debug, FromQueryResult)]
struct MaxTimeRow {
    max_time: Option<DateTime<Utc>>,
}

/// Build a cache key from a prefix and components.
///
/// Components are joined with `:`. Empty components are kept so distinct
/// queries never collide.
pub fn cache_key(prefix: &str, components: &[&str]) -> String {
    let mut key = prefix.to_string();
    for c in components {
        key.push(':');
        key.push_str(c);
    }
    key
}

/// Time of the newest stored reading.
pub async fn get_latest_time(state: &AppState) -> AppResult<Option<DateTime<Utc>>> {
    let result = state
        .db
        .query_one(Statement::from_string(
            state.db.get_database_backend(),
            "SELECT MAX(time) AS max_time FROM readings",
        ))
        .await?;

    Ok(result
        .and_then(|row| MaxTimeRow::from_query_result(&row, "").ok())
        .and_then(|r| r.max_time))
}

/// Whether data newer than `cached_max` has arrived since caching.
#[must_use]
pub fn is_stale(cached_max: Option<DateTime<Utc>>, latest: Option<DateTime<Utc>>) -> bool {
    match (cached_max, latest) {
        (Some(cached), Some(latest)) => latest > cached,
        (None, Some(_)) => true,
        (_, None) => false,
    }
}

/// Cached response bytes, unless missing or stale.
pub async fn get_cached(state: &AppState, cache_key: &str) -> Option<Arc<Vec<u8>>> {
    let cached = state.response_cache.get(cache_key).await?;

    if let Ok(latest) = get_latest_time(state).await
        && is_stale(cached.max_time, latest)
    {
        tracing::debug!(cache_key = %cache_key, "cache_stale");
        state.response_cache.invalidate(cache_key).await;
        return None;
    }

    tracing::debug!(cache_key = %cache_key, "cache_hit");
    Some(cached.data.clone())
}

pub async fn store_cached(
    state: &AppState,
    cache_key: String,
    data: Vec<u8>,
    max_time: Option<DateTime<Utc>>,
) {
    let size = data.len();
    state
        .response_cache
        .insert(
            cache_key.clone(),
            CachedResponse {
                data: Arc::new(data),
                max_time,
            },
        )
        .await;

    tracing::debug!(cache_key = %cache_key, size_bytes = size, "cache_stored");
}

/// JSON response with an `X-Cache: HIT|MISS` header.
pub fn json_response(data: Vec<u8>, cache_hit: bool) -> AppResult<Response> {
    let cache_header = if cache_hit { "HIT" } else { "MISS" };
    Response::builder()
        .header(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))
        .header("X-Cache", HeaderValue::from_static(cache_header))
        .body(axum::body::Body::from(data))
        .map_err(|e| AppError::Internal(e.to_string()))
}

/// Serialize, cache and return a freshly computed response.
pub async fn cache_and_respond<T: Serialize>(
    state: &AppState,
    cache_key: String,
    response: &T,
    max_time: Option<DateTime<Utc>>,
) -> AppResult<Response> {
    let json_bytes =
        serde_json::to_vec(response).map_err(|e| AppError::Internal(e.to_string()))?;

    store_cached(state, cache_key, json_bytes.clone(), max_time).await;

    json_response(json_bytes, false)
}
