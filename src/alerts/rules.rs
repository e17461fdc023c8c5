use crate::telemetry::Reading;

use super::AlertLevel;

/// Fixed-threshold checks that need no baseline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertRules {
    /// Battery below this voltage raises a warning.
    pub low_battery_volts: f64,
    /// Bright light (above this lux) with a low panel voltage hints at dirt
    /// or weather.
    pub dirt_suspect_min_lux: f64,
    pub dirt_suspect_max_volts: f64,
}

impl Default for AlertRules {
    fn default() -> Self {
        Self {
            low_battery_volts: 3.5,
            dirt_suspect_min_lux: 500.0,
            dirt_suspect_max_volts: 5.0,
        }
    }
}

impl AlertRules {
    /// Alerts raised by `reading`, in a stable order.
    #[must_use]
    pub fn check(&self, reading: &Reading) -> Vec<(AlertLevel, String)> {
        let mut raised = Vec::new();

        if reading.battery_voltage < self.low_battery_volts {
            raised.push((
                AlertLevel::Warning,
                format!("Low battery voltage ({:.2} V)", reading.battery_voltage),
            ));
        }

        if reading.lux > self.dirt_suspect_min_lux
            && reading.solar_voltage < self.dirt_suspect_max_volts
        {
            raised.push((
                AlertLevel::Warning,
                format!(
                    "Possible panel dirt / weather issue ({:.0} lux, {:.2} V)",
                    reading.lux, reading.solar_voltage
                ),
            ));
        }

        raised
    }
}
