use chrono::Utc;
use sea_orm::{sea_query::OnConflict, DatabaseConnection, EntityTrait, Set};

use crate::detector::Baseline;
use crate::entity::baseline;

use super::{BaselineStore, StoreError};

/// Keeps the baseline as the single row of the `baseline` table.
#[derive(Clone)]
pub struct DbBaselineStore {
    db: DatabaseConnection,
}

impl DbBaselineStore {
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

impl BaselineStore for DbBaselineStore {
    async fn load(&self) -> Result<Option<Baseline>, StoreError> {
        Ok(baseline::Entity::find_by_id(baseline::SINGLETON_ID)
            .one(&self.db)
            .await?
            .map(Baseline::from))
    }

    async fn save(&self, record: &Baseline) -> Result<(), StoreError> {
        baseline::Entity::insert(baseline::ActiveModel::from(record))
            .on_conflict(
                OnConflict::column(baseline::Column::Id)
                    .update_columns([
                        baseline::Column::Lux,
                        baseline::Column::AvgLdr,
                        baseline::Column::SolarCurrent,
                        baseline::Column::SetAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.db)
            .await?;

        tracing::debug!(set_at = %record.set_at, "Baseline persisted");
        Ok(())
    }
}

impl From<baseline::Model> for Baseline {
    fn from(m: baseline::Model) -> Self {
        Self {
            lux: m.lux,
            avg_ldr: m.avg_ldr,
            solar_current: m.solar_current,
            set_at: m.set_at.with_timezone(&Utc),
        }
    }
}

impl From<&Baseline> for baseline::ActiveModel {
    fn from(b: &Baseline) -> Self {
        Self {
            id: Set(baseline::SINGLETON_ID),
            lux: Set(b.lux),
            avg_ldr: Set(b.avg_ldr),
            solar_current: Set(b.solar_current),
            set_at: Set(b.set_at.into()),
        }
    }
}
