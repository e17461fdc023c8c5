use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};

use crate::common::AppState;
use crate::monitor::worker::{self, CycleOutcome};
use crate::telemetry::ThingSpeakClient;

/// Poll the channel forever on the configured interval.
///
/// On startup the current feed window is stored so history is available
/// before the first tick. Cycles never overlap: a slow fetch delays the next
/// tick instead of stacking them.
pub async fn run_telemetry_poll(state: AppState, client: ThingSpeakClient) {
    let interval_secs = state.config.poll_interval_seconds;

    tracing::info!(
        interval_secs,
        channel = %state.config.thingspeak_channel_id,
        "Starting telemetry poll scheduler"
    );

    match client.history().await {
        Ok(readings) => match worker::persist_readings(&state.db, &readings).await {
            Ok(inserted) => tracing::info!(
                fetched = readings.len(),
                inserted,
                "Backfilled feed history"
            ),
            Err(e) => tracing::warn!(error = %e, "Failed to store feed history"),
        },
        Err(e) => tracing::warn!(error = %e, "Failed to fetch feed history"),
    }

    let mut ticker = interval(Duration::from_secs(interval_secs));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        // First tick completes immediately
        ticker.tick().await;

        match worker::poll_once(&state, &client).await {
            CycleOutcome::Skipped => {}
            CycleOutcome::Evaluated { status, new_reading } => {
                tracing::debug!(?status, new_reading, "Telemetry poll completed");
            }
        }
    }
}
