use reqwest::Client;
use std::time::Duration;

use crate::config::Config;
use crate::telemetry::models::FeedsResponse;
use crate::telemetry::{Reading, TelemetryError, TelemetrySource};

pub struct ThingSpeakClient {
    http_client: Client,
    base_url: String,
    channel_id: String,
    read_api_key: Option<String>,
    results: u32,
}

impl ThingSpeakClient {
    /// Build a client for the configured channel.
    ///
    /// # Errors
    ///
    /// Returns `TelemetryError::Request` if the HTTP client cannot be constructed.
    pub fn new(config: &Config) -> Result<Self, TelemetryError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.thingspeak_timeout_seconds))
            .build()?;

        Ok(Self {
            http_client,
            base_url: config.thingspeak_base_url.trim_end_matches('/').to_string(),
            channel_id: config.thingspeak_channel_id.clone(),
            read_api_key: config.thingspeak_read_api_key.clone(),
            results: config.thingspeak_results,
        })
    }

    fn feeds_url(&self) -> String {
        format!("{}/channels/{}/feeds.json", self.base_url, self.channel_id)
    }

    /// Fetch the most recent feed entries for the channel.
    ///
    /// # Errors
    ///
    /// Returns `TelemetryError` if the request fails, returns an error status,
    /// or the body is not a valid feed document.
    pub async fn get_feeds(&self) -> Result<FeedsResponse, TelemetryError> {
        let mut query: Vec<(&str, String)> = vec![
            ("results", self.results.to_string()),
            ("status", "true".to_string()),
        ];
        if let Some(key) = &self.read_api_key {
            query.push(("api_key", key.clone()));
        }

        let response = self
            .http_client
            .get(self.feeds_url())
            .query(&query)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(TelemetryError::RateLimited);
        }

        if !response.status().is_success() {
            return Err(TelemetryError::Status {
                status: response.status().as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let text = response.text().await?;

        // A private channel read without a key answers 200 with body "-1"
        if text.trim() == "-1" {
            return Err(TelemetryError::Status {
                status: 401,
                body: "channel is private; set THINGSPEAK_READ_API_KEY".to_string(),
            });
        }

        serde_json::from_str(&text).map_err(|e| {
            tracing::error!(
                error = %e,
                body_preview = %text.chars().take(500).collect::<String>(),
                "Failed to parse ThingSpeak feeds response"
            );
            TelemetryError::Parse(e.to_string())
        })
    }

    /// Usable readings from the current feed window, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `TelemetryError` if the feed cannot be fetched.
    pub async fn history(&self) -> Result<Vec<Reading>, TelemetryError> {
        Ok(self.get_feeds().await?.readings())
    }
}

impl TelemetrySource for ThingSpeakClient {
    async fn poll(&self) -> Result<Reading, TelemetryError> {
        self.get_feeds().await?.latest().ok_or(TelemetryError::NoData)
    }
}
