use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::store::StoreError;

/// Thresholds and weights for calibration and classification.
///
/// Every value here is a policy knob. The defaults match the most complete
/// field deployment; none of them is physically derived.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct DetectorSettings {
    /// Calibration is refused below this ambient light.
    pub min_calibration_lux: f64,
    /// Calibration is refused below this panel current (mA).
    pub min_calibration_current_ma: f64,
    /// Readings darker than this are not evaluated.
    pub min_evaluation_lux: f64,
    /// Share of the lux-derived estimate; the LDR estimate gets the rest.
    pub lux_weight: f64,
    /// Ratios (percent) below this need cleaning.
    pub cleaning_required_below: f64,
    /// Ratios (percent) below this, but not below the cleaning cut, are watched.
    pub monitor_below: f64,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            min_calibration_lux: 100.0,
            min_calibration_current_ma: 50.0,
            min_evaluation_lux: 100.0,
            lux_weight: 0.6,
            cleaning_required_below: 70.0,
            monitor_below: 85.0,
        }
    }
}

/// Clean-panel reference captured by an explicit calibration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Baseline {
    pub lux: f64,
    /// `0.0` when the calibration reading carried no LDR value
    pub avg_ldr: f64,
    /// mA
    pub solar_current: f64,
    pub set_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PanelStatus {
    Clean,
    Monitor,
    CleaningRequired,
    Indeterminate,
}

/// Why an evaluation produced no classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum IndeterminateReason {
    NoBaseline,
    LowLight,
    DegenerateBaseline,
}

/// Outcome of evaluating one reading against the baseline.
///
/// The estimates and the ratio are present exactly when `status` is not
/// `Indeterminate`.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct EvaluationResult {
    /// Expected current (mA) extrapolated from the lux ratio
    pub expected_current_from_lux: Option<f64>,
    /// Expected current (mA) extrapolated from the LDR ratio
    pub expected_current_from_ldr: Option<f64>,
    /// Measured current as a percentage of the weighted expectation
    pub performance_ratio: Option<f64>,
    pub status: PanelStatus,
    pub reason: Option<IndeterminateReason>,
    /// Timestamp of the evaluated reading
    pub evaluated_at: DateTime<Utc>,
}

impl EvaluationResult {
    pub(crate) fn indeterminate(reason: IndeterminateReason, at: DateTime<Utc>) -> Self {
        Self {
            expected_current_from_lux: None,
            expected_current_from_ldr: None,
            performance_ratio: None,
            status: PanelStatus::Indeterminate,
            reason: Some(reason),
            evaluated_at: at,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CalibrationError {
    #[error("insufficient light for calibration: {lux} lux (minimum {min_lux})")]
    InsufficientLight { lux: f64, min_lux: f64 },

    #[error("insufficient panel current for calibration: {current_ma} mA (minimum {min_current_ma})")]
    InsufficientCurrent { current_ma: f64, min_current_ma: f64 },

    #[error("reading contains non-finite values")]
    InvalidReading,

    #[error("failed to persist baseline: {0}")]
    Store(#[from] StoreError),
}
