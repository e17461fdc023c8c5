use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::telemetry::Reading;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "readings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub entry_id: i64,
    pub time: DateTimeWithTimeZone,
    pub lux: f64,
    pub horizontal_error: f64,
    pub vertical_error: f64,
    pub servo_x: f64,
    pub servo_y: f64,
    pub solar_voltage: f64,
    pub solar_current: f64,
    pub battery_voltage: f64,
    pub avg_ldr: Option<f64>,
    pub status: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Reading> for ActiveModel {
    fn from(r: &Reading) -> Self {
        use sea_orm::Set;

        Self {
            entry_id: Set(r.entry_id),
            time: Set(r.timestamp.into()),
            lux: Set(r.lux),
            horizontal_error: Set(r.horizontal_error),
            vertical_error: Set(r.vertical_error),
            servo_x: Set(r.servo_x),
            servo_y: Set(r.servo_y),
            solar_voltage: Set(r.solar_voltage),
            solar_current: Set(r.solar_current),
            battery_voltage: Set(r.battery_voltage),
            avg_ldr: Set(r.avg_ldr),
            status: Set(r.status.clone()),
        }
    }
}

impl From<Model> for Reading {
    fn from(m: Model) -> Self {
        Self {
            entry_id: m.entry_id,
            timestamp: m.time.with_timezone(&chrono::Utc),
            lux: m.lux,
            horizontal_error: m.horizontal_error,
            vertical_error: m.vertical_error,
            servo_x: m.servo_x,
            servo_y: m.servo_y,
            solar_voltage: m.solar_voltage,
            solar_current: m.solar_current,
            battery_voltage: m.battery_voltage,
            avg_ldr: m.avg_ldr,
            status: m.status,
        }
    }
}
