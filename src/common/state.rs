use chrono::{DateTime, Utc};
use moka::future::Cache;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};

use crate::alerts::AlertFeed;
use crate::config::Config;
use crate::detector::{EvaluationResult, SoilingDetector};
use crate::store::AnyBaselineStore;
use crate::telemetry::Reading;

/// Cached response with metadata for freshness checking
#[derive(Clone)]
pub struct CachedResponse {
    pub data: Arc<Vec<u8>>,
    pub max_time: Option<DateTime<Utc>>,
}

/// Cache for API responses. Key is request params, value is serialized response + metadata.
/// Weighted by byte size to enforce memory limit.
pub type ResponseCache = Cache<String, CachedResponse>;

pub type Detector = SoilingDetector<AnyBaselineStore, Arc<AlertFeed>>;

/// What the last poll cycle saw.
#[derive(Debug, Clone, Default)]
pub struct LiveSnapshot {
    pub reading: Option<Reading>,
    pub evaluation: Option<EvaluationResult>,
    pub polled_at: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<Config>,
    /// Poll cycles and calibrations serialize on this lock
    pub detector: Arc<Mutex<Detector>>,
    pub alerts: Arc<AlertFeed>,
    pub live: Arc<RwLock<LiveSnapshot>>,
    pub response_cache: ResponseCache,
}

impl AppState {
    pub fn new(
        db: DatabaseConnection,
        config: Config,
        detector: Detector,
        alerts: Arc<AlertFeed>,
    ) -> Self {
        // Cache weighted by byte size, not entry count
        let cache: ResponseCache = Cache::builder()
            .weigher(|_key: &String, value: &CachedResponse| -> u32 {
                value.data.len().try_into().unwrap_or(u32::MAX)
            })
            .max_capacity(config.cache_max_bytes)
            .time_to_live(Duration::from_secs(config.cache_ttl_seconds))
            .build();

        Self {
            db,
            config: Arc::new(config),
            detector: Arc::new(Mutex::new(detector)),
            alerts,
            live: Arc::new(RwLock::new(LiveSnapshot::default())),
            response_cache: cache,
        }
    }
}
