//! Panel soiling detection.
//!
//! A clean panel's current scales with incident light. The detector keeps a
//! baseline captured under good light and, for each new reading, extrapolates
//! the current a clean panel would deliver from two independent light
//! channels (the lux sensor and the averaged LDRs). The measured current as a
//! percentage of that expectation decides the panel status.

mod soiling;
mod types;

pub use soiling::SoilingDetector;
pub use types::{
    Baseline, CalibrationError, DetectorSettings, EvaluationResult, IndeterminateReason,
    PanelStatus,
};
