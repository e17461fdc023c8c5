//! Telemetry from the solar tracker's ThingSpeak channel.
//!
//! The device writes one feed entry per update: eight numeric fields plus a
//! free-text status that carries the averaged LDR reading.

pub mod client;
pub mod models;

pub use client::ThingSpeakClient;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use utoipa::ToSchema;

/// A single usable telemetry sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Reading {
    /// ThingSpeak entry id
    pub entry_id: i64,
    pub timestamp: DateTime<Utc>,
    /// Ambient light (field1)
    pub lux: f64,
    /// Tracker horizontal error (field2)
    pub horizontal_error: f64,
    /// Tracker vertical error (field3)
    pub vertical_error: f64,
    /// Servo X angle (field4)
    pub servo_x: f64,
    /// Servo Y angle (field5)
    pub servo_y: f64,
    /// Panel voltage in V (field6)
    pub solar_voltage: f64,
    /// Panel current in mA (field7)
    pub solar_current: f64,
    /// Battery voltage in V (field8)
    pub battery_voltage: f64,
    /// Average of the four LDRs, parsed from the status string
    pub avg_ldr: Option<f64>,
    /// Raw status text
    pub status: Option<String>,
}

impl Reading {
    /// Panel output power in watts (V * mA / 1000).
    #[must_use]
    pub fn power_watts(&self) -> f64 {
        self.solar_voltage * self.solar_current / 1000.0
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Rate limited (429)")]
    RateLimited,

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to parse feed: {0}")]
    Parse(String),

    #[error("Channel returned no usable entries")]
    NoData,
}

/// Anything that can hand over the latest reading on demand.
///
/// An `Err` means the source is unavailable for this cycle; callers skip
/// evaluation instead of working with stale or zeroed data.
pub trait TelemetrySource: Send + Sync {
    fn poll(&self) -> impl Future<Output = Result<Reading, TelemetryError>> + Send;
}
