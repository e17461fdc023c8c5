use chrono::Utc;
use sea_orm::{sea_query::OnConflict, DatabaseConnection, DbErr, EntityTrait};

use crate::alerts::AlertSink;
use crate::common::{AppState, LiveSnapshot};
use crate::detector::PanelStatus;
use crate::entity::readings;
use crate::error::AppResult;
use crate::telemetry::{Reading, TelemetrySource};

/// Batch size for bulk inserts
const BATCH_SIZE: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The source had nothing for us; no evaluation happened.
    Skipped,
    Evaluated {
        status: PanelStatus,
        /// False when the channel still reports the previous entry
        new_reading: bool,
    },
}

/// Run one poll cycle: fetch, store, evaluate, alert.
///
/// Storage failures are logged and do not stop evaluation.
pub async fn poll_once<T: TelemetrySource>(state: &AppState, source: &T) -> CycleOutcome {
    let reading = match source.poll().await {
        Ok(reading) => reading,
        Err(e) => {
            tracing::warn!(error = %e, "Telemetry unavailable, skipping cycle");
            return CycleOutcome::Skipped;
        }
    };

    if let Err(e) = persist_readings(&state.db, std::slice::from_ref(&reading)).await {
        tracing::warn!(error = %e, entry_id = reading.entry_id, "Failed to store reading");
    }

    process_reading(state, reading).await
}

/// Evaluate a fresh reading and publish it as the live snapshot.
///
/// Threshold rules only fire for readings not seen in the previous cycle.
pub async fn process_reading(state: &AppState, reading: Reading) -> CycleOutcome {
    let new_reading = state.live.read().await.reading.as_ref().is_none_or(|previous| {
        previous.entry_id != reading.entry_id || previous.timestamp != reading.timestamp
    });

    let evaluation = state.detector.lock().await.evaluate(&reading);

    if new_reading {
        for (level, message) in state.config.alert_rules.check(&reading) {
            state.alerts.notify(level, &message, reading.timestamp);
        }
    }

    tracing::debug!(
        entry_id = reading.entry_id,
        lux = reading.lux,
        solar_current = reading.solar_current,
        ratio = ?evaluation.performance_ratio,
        status = ?evaluation.status,
        new_reading,
        "Poll cycle processed"
    );

    let status = evaluation.status;
    *state.live.write().await = LiveSnapshot {
        reading: Some(reading),
        evaluation: Some(evaluation),
        polled_at: Some(Utc::now()),
    };

    CycleOutcome::Evaluated {
        status,
        new_reading,
    }
}

/// Insert readings, ignoring entries already stored.
///
/// # Errors
///
/// Returns an error if the database rejects the insert.
pub async fn persist_readings(db: &DatabaseConnection, batch: &[Reading]) -> AppResult<u64> {
    let mut inserted = 0;

    for chunk in batch.chunks(BATCH_SIZE) {
        let models: Vec<readings::ActiveModel> = chunk.iter().map(Into::into).collect();

        match readings::Entity::insert_many(models)
            .on_conflict(
                OnConflict::column(readings::Column::EntryId)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await
        {
            Ok(rows) => inserted += rows,
            // ON CONFLICT DO NOTHING with every row already present
            Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e.into()),
        }
    }

    if inserted > 0 {
        tracing::debug!(inserted, "Stored new readings");
    }
    Ok(inserted)
}
