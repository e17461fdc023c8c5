use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Reading;

/// Response from `/channels/{id}/feeds.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedsResponse {
    pub channel: Channel,
    #[serde(default)]
    pub feeds: Vec<Feed>,
}

/// Channel metadata. Field labels are whatever the owner configured.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_entry_id: Option<i64>,
}

/// One feed entry. ThingSpeak sends every field as a string or null.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feed {
    pub created_at: DateTime<Utc>,
    pub entry_id: i64,
    #[serde(default)]
    pub field1: Option<String>,
    #[serde(default)]
    pub field2: Option<String>,
    #[serde(default)]
    pub field3: Option<String>,
    #[serde(default)]
    pub field4: Option<String>,
    #[serde(default)]
    pub field5: Option<String>,
    #[serde(default)]
    pub field6: Option<String>,
    #[serde(default)]
    pub field7: Option<String>,
    #[serde(default)]
    pub field8: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl Feed {
    /// Convert to a reading. Entries with any missing or non-numeric field
    /// are unusable and yield `None`.
    #[must_use]
    pub fn to_reading(&self) -> Option<Reading> {
        let status = self
            .status
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Some(Reading {
            entry_id: self.entry_id,
            timestamp: self.created_at,
            lux: parse_field(self.field1.as_deref())?,
            horizontal_error: parse_field(self.field2.as_deref())?,
            vertical_error: parse_field(self.field3.as_deref())?,
            servo_x: parse_field(self.field4.as_deref())?,
            servo_y: parse_field(self.field5.as_deref())?,
            solar_voltage: parse_field(self.field6.as_deref())?,
            solar_current: parse_field(self.field7.as_deref())?,
            battery_voltage: parse_field(self.field8.as_deref())?,
            avg_ldr: status.as_deref().and_then(parse_avg_ldr),
            status,
        })
    }
}

impl FeedsResponse {
    /// Usable readings in feed order (oldest first).
    #[must_use]
    pub fn readings(&self) -> Vec<Reading> {
        self.feeds.iter().filter_map(Feed::to_reading).collect()
    }

    /// Newest usable reading.
    #[must_use]
    pub fn latest(&self) -> Option<Reading> {
        self.feeds.iter().rev().find_map(Feed::to_reading)
    }
}

fn parse_field(raw: Option<&str>) -> Option<f64> {
    raw.and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Extract the averaged LDR value from a status string.
///
/// Accepts `avgLDR=512`, `ldr: 512` (case-insensitive, `=` or `:`), possibly
/// among other tokens separated by `,` `;` or whitespace, or a bare number.
#[must_use]
pub fn parse_avg_ldr(status: &str) -> Option<f64> {
    let status = status.trim();

    if let Ok(value) = status.parse::<f64>() {
        return Some(value).filter(|v| v.is_finite() && *v >= 0.0);
    }

    // Normalise "key : value" to "key:value" so whitespace can split tokens
    let compact = status.replace(" :", ":").replace(": ", ":").replace(" =", "=").replace("= ", "=");

    compact
        .split(|c: char| c == ',' || c == ';' || c.is_whitespace())
        .filter_map(|token| token.split_once(['=', ':']))
        .find(|(key, _)| {
            let key = key.trim().to_ascii_lowercase();
            key == "avgldr" || key == "ldr" || key == "avg_ldr"
        })
        .and_then(|(_, value)| value.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v >= 0.0)
}
