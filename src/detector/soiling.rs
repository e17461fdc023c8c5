use chrono::{DateTime, SubsecRound, Utc};

use crate::alerts::{AlertLevel, AlertSink};
use crate::store::{BaselineStore, StoreError};
use crate::telemetry::Reading;

use super::types::{
    Baseline, CalibrationError, DetectorSettings, EvaluationResult, IndeterminateReason,
    PanelStatus,
};

/// Compares live panel current against the current a clean panel would
/// produce under the same light, as extrapolated from the baseline.
pub struct SoilingDetector<S, A> {
    settings: DetectorSettings,
    baseline: Option<Baseline>,
    store: S,
    sink: A,
    /// Last determinate classification, for the back-to-clean confirmation
    last_status: Option<PanelStatus>,
    /// Timestamp of the last reading that produced a classification
    last_evaluated_at: Option<DateTime<Utc>>,
    degenerate_logged: bool,
}

/// Component estimates for one reading.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Estimate {
    from_lux: f64,
    from_ldr: Option<f64>,
    ratio: f64,
}

impl<S: BaselineStore, A: AlertSink> SoilingDetector<S, A> {
    /// Detector with no baseline. Every evaluation is indeterminate until
    /// `set_baseline` succeeds.
    pub fn new(settings: DetectorSettings, store: S, sink: A) -> Self {
        Self {
            settings,
            baseline: None,
            store,
            sink,
            last_status: None,
            last_evaluated_at: None,
            degenerate_logged: false,
        }
    }

    /// Detector primed with whatever baseline the store holds.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the store cannot be read.
    pub async fn load(settings: DetectorSettings, store: S, sink: A) -> Result<Self, StoreError> {
        let mut detector = Self::new(settings, store, sink);
        detector.baseline = detector.store.load().await?;

        match &detector.baseline {
            Some(b) => tracing::info!(
                lux = b.lux,
                avg_ldr = b.avg_ldr,
                solar_current = b.solar_current,
                set_at = %b.set_at,
                "Loaded calibration baseline"
            ),
            None => tracing::info!("No calibration baseline stored; evaluations are indeterminate"),
        }

        Ok(detector)
    }

    #[must_use]
    pub fn baseline(&self) -> Option<&Baseline> {
        self.baseline.as_ref()
    }

    #[must_use]
    pub fn settings(&self) -> &DetectorSettings {
        &self.settings
    }

    /// Capture `reading` as the clean-panel reference.
    ///
    /// The previous baseline survives any error, including a failed save.
    ///
    /// # Errors
    ///
    /// Returns `CalibrationError` when the reading is too dark, the panel
    /// current is too low, or the baseline cannot be persisted.
    pub async fn set_baseline(&mut self, reading: &Reading) -> Result<Baseline, CalibrationError> {
        let finite = reading.lux.is_finite()
            && reading.solar_current.is_finite()
            && reading.avg_ldr.is_none_or(f64::is_finite);
        if !finite {
            return Err(CalibrationError::InvalidReading);
        }

        if reading.lux < self.settings.min_calibration_lux {
            tracing::info!(lux = reading.lux, "Calibration refused: insufficient light");
            return Err(CalibrationError::InsufficientLight {
                lux: reading.lux,
                min_lux: self.settings.min_calibration_lux,
            });
        }

        if reading.solar_current < self.settings.min_calibration_current_ma {
            tracing::info!(
                solar_current = reading.solar_current,
                "Calibration refused: insufficient current"
            );
            return Err(CalibrationError::InsufficientCurrent {
                current_ma: reading.solar_current,
                min_current_ma: self.settings.min_calibration_current_ma,
            });
        }

        let baseline = Baseline {
            lux: reading.lux,
            avg_ldr: reading.avg_ldr.unwrap_or(0.0),
            solar_current: reading.solar_current,
            // Postgres keeps microseconds
            set_at: Utc::now().trunc_subsecs(6),
        };

        self.store.save(&baseline).await?;

        self.baseline = Some(baseline.clone());
        self.last_evaluated_at = None;
        self.degenerate_logged = false;

        tracing::info!(
            lux = baseline.lux,
            avg_ldr = baseline.avg_ldr,
            solar_current = baseline.solar_current,
            "Calibration baseline set"
        );
        self.sink.notify(
            AlertLevel::Info,
            &format!(
                "Baseline set at {}",
                baseline.set_at.format("%Y-%m-%d %H:%M:%S UTC")
            ),
            baseline.set_at,
        );

        Ok(baseline)
    }

    /// Classify one reading.
    ///
    /// Evaluating the same reading again returns the same result without
    /// notifying the sink a second time.
    pub fn evaluate(&mut self, reading: &Reading) -> EvaluationResult {
        let at = reading.timestamp;

        let Some(baseline) = &self.baseline else {
            tracing::debug!("Skipping evaluation: no baseline");
            return EvaluationResult::indeterminate(IndeterminateReason::NoBaseline, at);
        };

        // Negated so NaN lux also lands here
        if !(reading.lux >= self.settings.min_evaluation_lux) {
            tracing::debug!(lux = reading.lux, "Skipping evaluation: low light");
            return EvaluationResult::indeterminate(IndeterminateReason::LowLight, at);
        }

        let Some(estimate) = estimate(&self.settings, baseline, reading) else {
            if !self.degenerate_logged {
                tracing::warn!(
                    baseline_lux = baseline.lux,
                    baseline_avg_ldr = baseline.avg_ldr,
                    baseline_current = baseline.solar_current,
                    reading_current = reading.solar_current,
                    "Expected current is not computable; evaluation indeterminate"
                );
                self.degenerate_logged = true;
            }
            return EvaluationResult::indeterminate(IndeterminateReason::DegenerateBaseline, at);
        };

        let status = classify(&self.settings, estimate.ratio);

        tracing::debug!(
            ratio = estimate.ratio,
            from_lux = estimate.from_lux,
            from_ldr = ?estimate.from_ldr,
            status = ?status,
            "Evaluated panel performance"
        );

        if self.last_evaluated_at != Some(at) {
            self.notify(status, estimate.ratio, at);
            self.last_evaluated_at = Some(at);
        }
        self.last_status = Some(status);

        EvaluationResult {
            expected_current_from_lux: Some(estimate.from_lux),
            expected_current_from_ldr: estimate.from_ldr,
            performance_ratio: Some(estimate.ratio),
            status,
            reason: None,
            evaluated_at: at,
        }
    }

    fn notify(&self, status: PanelStatus, ratio: f64, at: DateTime<Utc>) {
        match status {
            PanelStatus::CleaningRequired => self.sink.notify(
                AlertLevel::Danger,
                &format!("Cleaning required: panel output at {ratio:.1}% of expected"),
                at,
            ),
            PanelStatus::Monitor => self.sink.notify(
                AlertLevel::Warning,
                &format!("Monitor panel: output at {ratio:.1}% of expected"),
                at,
            ),
            PanelStatus::Clean
                if matches!(
                    self.last_status,
                    Some(PanelStatus::Monitor | PanelStatus::CleaningRequired)
                ) =>
            {
                self.sink.notify(
                    AlertLevel::Info,
                    &format!("Panel output back to normal ({ratio:.1}% of expected)"),
                    at,
                );
            }
            PanelStatus::Clean | PanelStatus::Indeterminate => {}
        }
    }
}

/// Weighted expectation and performance ratio, or `None` if any
/// intermediate value would be non-finite or non-positive.
fn estimate(settings: &DetectorSettings, baseline: &Baseline, reading: &Reading) -> Option<Estimate> {
    let usable = |v: f64| v.is_finite() && v > 0.0;
    if !usable(baseline.lux) || !usable(baseline.solar_current) || !reading.solar_current.is_finite() {
        return None;
    }

    let from_lux = reading.lux / baseline.lux * baseline.solar_current;
    let from_ldr = match reading.avg_ldr {
        Some(ldr) if usable(baseline.avg_ldr) && ldr.is_finite() => {
            Some(ldr / baseline.avg_ldr * baseline.solar_current)
        }
        _ => None,
    };

    let expected = match from_ldr {
        Some(ldr) => settings.lux_weight * from_lux + (1.0 - settings.lux_weight) * ldr,
        None => from_lux,
    };
    if !usable(expected) {
        return None;
    }

    let ratio = 100.0 * reading.solar_current / expected;
    ratio.is_finite().then_some(Estimate {
        from_lux,
        from_ldr,
        ratio,
    })
}

fn classify(settings: &DetectorSettings, ratio: f64) -> PanelStatus {
    if ratio < settings.cleaning_required_below {
        PanelStatus::CleaningRequired
    } else if ratio < settings.monitor_below {
        PanelStatus::Monitor
    } else {
        PanelStatus::Clean
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::AlertFeed;
    use crate::store::MemoryBaselineStore;
    use chrono::{Duration, TimeZone};
    use std::sync::Arc;

    fn reading(lux: f64, avg_ldr: Option<f64>, current: f64, second: i64) -> Reading {
        Reading {
            entry_id: second,
            timestamp: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap() + Duration::seconds(second),
            lux,
            horizontal_error: 0.0,
            vertical_error: 0.0,
            servo_x: 90.0,
            servo_y: 45.0,
            solar_voltage: 6.0,
            solar_current: current,
            battery_voltage: 3.9,
            avg_ldr,
            status: None,
        }
    }

    async fn calibrated(
        baseline: &Reading,
    ) -> (SoilingDetector<MemoryBaselineStore, Arc<AlertFeed>>, Arc<AlertFeed>) {
        let feed = Arc::new(AlertFeed::new(10));
        let mut detector = SoilingDetector::new(
            DetectorSettings::default(),
            MemoryBaselineStore::default(),
            feed.clone(),
        );
        detector.set_baseline(baseline).await.unwrap();
        feed.clear();
        (detector, feed)
    }

    #[test]
    fn classify_cut_points() {
        let s = DetectorSettings::default();
        assert_eq!(classify(&s, 69.99), PanelStatus::CleaningRequired);
        assert_eq!(classify(&s, 70.0), PanelStatus::Monitor);
        assert_eq!(classify(&s, 84.99), PanelStatus::Monitor);
        assert_eq!(classify(&s, 85.0), PanelStatus::Clean);
        assert_eq!(classify(&s, 130.0), PanelStatus::Clean);
    }

    #[test]
    fn estimate_weights_lux_and_ldr() {
        let baseline = Baseline {
            lux: 1000.0,
            avg_ldr: 800.0,
            solar_current: 200.0,
            set_at: Utc::now(),
        };
        // lux says 100 mA, LDR says 150 mA -> 0.6*100 + 0.4*150 = 120
        let r = reading(500.0, Some(600.0), 90.0, 0);
        let e = estimate(&DetectorSettings::default(), &baseline, &r).unwrap();
        assert!((e.from_lux - 100.0).abs() < 1e-9);
        assert!((e.from_ldr.unwrap() - 150.0).abs() < 1e-9);
        assert!((e.ratio - 75.0).abs() < 1e-9);
    }

    #[test]
    fn estimate_rejects_zero_denominators() {
        let baseline = Baseline {
            lux: 0.0,
            avg_ldr: 800.0,
            solar_current: 200.0,
            set_at: Utc::now(),
        };
        assert!(estimate(&DetectorSettings::default(), &baseline, &reading(900.0, Some(700.0), 150.0, 0)).is_none());

        let dark_ldr = Baseline {
            lux: 1000.0,
            avg_ldr: 800.0,
            solar_current: 200.0,
            set_at: Utc::now(),
        };
        // Lux-only weight of zero plus an LDR reading of zero leaves nothing to divide by
        let settings = DetectorSettings {
            lux_weight: 0.0,
            ..DetectorSettings::default()
        };
        assert!(estimate(&settings, &dark_ldr, &reading(900.0, Some(0.0), 150.0, 0)).is_none());
    }

    #[tokio::test]
    async fn repeated_reading_does_not_repeat_alert() {
        let (mut detector, feed) = calibrated(&reading(1000.0, Some(800.0), 200.0, 0)).await;

        let dirty = reading(1000.0, Some(800.0), 120.0, 20);
        assert_eq!(detector.evaluate(&dirty).status, PanelStatus::CleaningRequired);
        assert_eq!(detector.evaluate(&dirty).status, PanelStatus::CleaningRequired);
        assert_eq!(feed.len(), 1);

        // A new reading with the same classification alerts again
        let still_dirty = reading(1000.0, Some(800.0), 121.0, 40);
        detector.evaluate(&still_dirty);
        assert_eq!(feed.len(), 2);
    }

    #[tokio::test]
    async fn recovery_to_clean_is_confirmed_once() {
        let (mut detector, feed) = calibrated(&reading(1000.0, Some(800.0), 200.0, 0)).await;

        detector.evaluate(&reading(1000.0, Some(800.0), 160.0, 20));
        detector.evaluate(&reading(1000.0, Some(800.0), 198.0, 40));
        detector.evaluate(&reading(1000.0, Some(800.0), 199.0, 60));

        let alerts = feed.snapshot();
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].level, AlertLevel::Info);
        assert!(alerts[0].message.contains("back to normal"));
        assert_eq!(alerts[1].level, AlertLevel::Warning);
    }

    #[tokio::test]
    async fn clean_from_the_start_is_silent() {
        let (mut detector, feed) = calibrated(&reading(1000.0, Some(800.0), 200.0, 0)).await;
        detector.evaluate(&reading(900.0, Some(720.0), 180.0, 20));
        assert!(feed.is_empty());
    }

    #[tokio::test]
    async fn degenerate_baseline_from_store_is_indeterminate() {
        let store = MemoryBaselineStore::with_baseline(Baseline {
            lux: 0.0,
            avg_ldr: 0.0,
            solar_current: 0.0,
            set_at: Utc::now(),
        });
        let feed = Arc::new(AlertFeed::new(10));
        let mut detector = SoilingDetector::load(DetectorSettings::default(), store, feed.clone())
            .await
            .unwrap();

        let result = detector.evaluate(&reading(900.0, Some(700.0), 150.0, 0));
        assert_eq!(result.status, PanelStatus::Indeterminate);
        assert_eq!(result.reason, Some(IndeterminateReason::DegenerateBaseline));
        assert!(result.performance_ratio.is_none());
        assert!(feed.is_empty());
    }

    #[tokio::test]
    async fn failed_save_keeps_previous_baseline() {
        let feed = Arc::new(AlertFeed::new(10));
        let store = MemoryBaselineStore::default();
        let mut detector = SoilingDetector::new(DetectorSettings::default(), store.clone(), feed);
        let first = detector
            .set_baseline(&reading(1000.0, Some(800.0), 200.0, 0))
            .await
            .unwrap();

        store.fail_saves(true);
        let err = detector
            .set_baseline(&reading(1500.0, Some(900.0), 260.0, 20))
            .await
            .unwrap_err();
        assert!(matches!(err, CalibrationError::Store(_)));
        assert_eq!(detector.baseline(), Some(&first));
    }

    #[tokio::test]
    async fn baseline_time_survives_microsecond_storage() {
        let (detector, _) = calibrated(&reading(1000.0, Some(800.0), 200.0, 0)).await;
        let set_at = detector.baseline().unwrap().set_at;
        assert_eq!(set_at, set_at.trunc_subsecs(6));
    }

    #[tokio::test]
    async fn non_finite_reading_is_refused() {
        let feed = Arc::new(AlertFeed::new(10));
        let mut detector = SoilingDetector::new(
            DetectorSettings::default(),
            MemoryBaselineStore::default(),
            feed,
        );
        let err = detector
            .set_baseline(&reading(f64::NAN, None, 200.0, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, CalibrationError::InvalidReading));
        assert!(detector.baseline().is_none());
    }
}
