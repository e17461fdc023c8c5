use std::env;
use std::str::FromStr;

use chrono::TimeDelta;

use crate::alerts::AlertRules;
use crate::detector::DetectorSettings;

const DEFAULT_THINGSPEAK_BASE_URL: &str = "https://api.thingspeak.com";
const DEFAULT_THINGSPEAK_RESULTS: u32 = 20;
const DEFAULT_THINGSPEAK_TIMEOUT_SECONDS: u64 = 15;
const DEFAULT_POLL_INTERVAL_SECONDS: u64 = 20;
const DEFAULT_ALERT_FEED_CAPACITY: usize = 10;
const MAX_POLL_INTERVAL_SECONDS: u64 = 24 * 60 * 60;

#[derive(Debug, Clone)]
pub enum Deployment {
    Local,
    Dev,
    Stage,
    Prod,
}

impl Deployment {
    #[must_use]
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Self::Dev,
            "stage" | "staging" => Self::Stage,
            "prod" | "production" => Self::Prod,
            _ => Self::Local,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    // Database
    pub database_url: String,

    // ThingSpeak channel
    pub thingspeak_base_url: String,
    pub thingspeak_channel_id: String,
    pub thingspeak_read_api_key: Option<String>,
    pub thingspeak_results: u32,
    pub thingspeak_timeout_seconds: u64,

    // Polling
    pub poll_interval_seconds: u64,

    // Soiling detection tunables
    pub detector: DetectorSettings,

    // Rule-based alerts
    pub alert_rules: AlertRules,
    pub alert_feed_capacity: usize,

    // API settings
    pub api_host: String,
    pub api_port: u16,

    // Rate limiting
    pub disable_rate_limiting: bool,
    pub rate_limit_per_second: u64,
    pub rate_limit_burst: u32,

    // Caching
    pub cache_ttl_seconds: u64,
    pub cache_max_bytes: u64,

    // Application metadata
    pub deployment: Deployment,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            thingspeak_base_url: DEFAULT_THINGSPEAK_BASE_URL.to_string(),
            thingspeak_channel_id: String::new(),
            thingspeak_read_api_key: None,
            thingspeak_results: DEFAULT_THINGSPEAK_RESULTS,
            thingspeak_timeout_seconds: DEFAULT_THINGSPEAK_TIMEOUT_SECONDS,
            poll_interval_seconds: DEFAULT_POLL_INTERVAL_SECONDS,
            detector: DetectorSettings::default(),
            alert_rules: AlertRules::default(),
            alert_feed_capacity: DEFAULT_ALERT_FEED_CAPACITY,
            api_host: "0.0.0.0".to_string(),
            api_port: 3000,
            disable_rate_limiting: false,
            rate_limit_per_second: 5,
            rate_limit_burst: 60,
            cache_ttl_seconds: 20,
            cache_max_bytes: 16 * 1024 * 1024, // 16MB
            deployment: Deployment::Local,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Unset optional values take their defaults. Set values must parse.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if required environment variables are not set,
    /// or `ConfigError::Invalid` if a value does not parse or the tunables
    /// contradict each other.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        let detector_defaults = defaults.detector;
        let rule_defaults = defaults.alert_rules;

        let config = Self {
            // Database
            database_url: env::var("DATABASE_URL")
                .map_err(|_| ConfigError::Missing("DATABASE_URL"))?,

            // ThingSpeak channel
            thingspeak_base_url: env::var("THINGSPEAK_BASE_URL")
                .unwrap_or(defaults.thingspeak_base_url),
            thingspeak_channel_id: env::var("THINGSPEAK_CHANNEL_ID")
                .map_err(|_| ConfigError::Missing("THINGSPEAK_CHANNEL_ID"))?,
            thingspeak_read_api_key: env::var("THINGSPEAK_READ_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty()),
            thingspeak_results: env_or("THINGSPEAK_RESULTS", defaults.thingspeak_results)?,
            thingspeak_timeout_seconds: env_or(
                "THINGSPEAK_TIMEOUT_SECONDS",
                defaults.thingspeak_timeout_seconds,
            )?,

            // Polling
            poll_interval_seconds: env_or("POLL_INTERVAL_SECONDS", defaults.poll_interval_seconds)?,

            // Soiling detection tunables
            detector: DetectorSettings {
                min_calibration_lux: env_or(
                    "CALIBRATION_MIN_LUX",
                    detector_defaults.min_calibration_lux,
                )?,
                min_calibration_current_ma: env_or(
                    "CALIBRATION_MIN_CURRENT_MA",
                    detector_defaults.min_calibration_current_ma,
                )?,
                min_evaluation_lux: env_or(
                    "EVALUATION_MIN_LUX",
                    detector_defaults.min_evaluation_lux,
                )?,
                lux_weight: env_or("LUX_ESTIMATE_WEIGHT", detector_defaults.lux_weight)?,
                cleaning_required_below: env_or(
                    "CLEANING_REQUIRED_BELOW_PERCENT",
                    detector_defaults.cleaning_required_below,
                )?,
                monitor_below: env_or("MONITOR_BELOW_PERCENT", detector_defaults.monitor_below)?,
            },

            // Rule-based alerts
            alert_rules: AlertRules {
                low_battery_volts: env_or("LOW_BATTERY_VOLTS", rule_defaults.low_battery_volts)?,
                dirt_suspect_min_lux: env_or(
                    "DIRT_SUSPECT_MIN_LUX",
                    rule_defaults.dirt_suspect_min_lux,
                )?,
                dirt_suspect_max_volts: env_or(
                    "DIRT_SUSPECT_MAX_VOLTS",
                    rule_defaults.dirt_suspect_max_volts,
                )?,
            },
            alert_feed_capacity: env_or("ALERT_FEED_CAPACITY", defaults.alert_feed_capacity)?,

            // API settings
            api_host: env::var("API_HOST").unwrap_or(defaults.api_host),
            api_port: env_or("API_PORT", defaults.api_port)?,

            // Rate limiting
            disable_rate_limiting: env_or("DISABLE_RATE_LIMITING", defaults.disable_rate_limiting)?,
            rate_limit_per_second: env_or("RATE_LIMIT_PER_SECOND", defaults.rate_limit_per_second)?,
            rate_limit_burst: env_or("RATE_LIMIT_BURST", defaults.rate_limit_burst)?,

            // Caching
            cache_ttl_seconds: env_or("CACHE_TTL_SECONDS", defaults.cache_ttl_seconds)?,
            cache_max_bytes: env_or("CACHE_MAX_BYTES", defaults.cache_max_bytes)?,

            // Application metadata
            deployment: Deployment::from_str(
                &env::var("DEPLOYMENT").unwrap_or_else(|_| "local".to_string()),
            ),
        };

        config.validate()?;
        Ok(config)
    }

    /// Check that the tunables describe a usable detector.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` naming the offending variable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let d = &self.detector;
        let r = &self.alert_rules;

        for (key, value) in [
            ("CALIBRATION_MIN_LUX", d.min_calibration_lux),
            ("CALIBRATION_MIN_CURRENT_MA", d.min_calibration_current_ma),
            ("EVALUATION_MIN_LUX", d.min_evaluation_lux),
            ("LUX_ESTIMATE_WEIGHT", d.lux_weight),
            ("CLEANING_REQUIRED_BELOW_PERCENT", d.cleaning_required_below),
            ("MONITOR_BELOW_PERCENT", d.monitor_below),
            ("LOW_BATTERY_VOLTS", r.low_battery_volts),
            ("DIRT_SUSPECT_MIN_LUX", r.dirt_suspect_min_lux),
            ("DIRT_SUSPECT_MAX_VOLTS", r.dirt_suspect_max_volts),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::Invalid(key, format!("{value} is not a finite number")));
            }
        }

        if !(0.0..=1.0).contains(&d.lux_weight) {
            return Err(ConfigError::Invalid(
                "LUX_ESTIMATE_WEIGHT",
                format!("{} is outside [0, 1]", d.lux_weight),
            ));
        }
        if d.monitor_below < d.cleaning_required_below {
            return Err(ConfigError::Invalid(
                "MONITOR_BELOW_PERCENT",
                format!(
                    "{} is below CLEANING_REQUIRED_BELOW_PERCENT ({})",
                    d.monitor_below, d.cleaning_required_below
                ),
            ));
        }
        if d.min_calibration_lux <= 0.0 || d.min_calibration_current_ma <= 0.0 {
            return Err(ConfigError::Invalid(
                "CALIBRATION_MIN_LUX",
                "calibration minimums must be positive".to_string(),
            ));
        }
        if !(1..=MAX_POLL_INTERVAL_SECONDS).contains(&self.poll_interval_seconds) {
            return Err(ConfigError::Invalid(
                "POLL_INTERVAL_SECONDS",
                format!("must be between 1 and {MAX_POLL_INTERVAL_SECONDS}"),
            ));
        }
        if self.alert_feed_capacity == 0 {
            return Err(ConfigError::Invalid(
                "ALERT_FEED_CAPACITY",
                "must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }

    /// How old the last poll may be before the live reading counts as stale.
    #[must_use]
    pub fn readiness_window(&self) -> TimeDelta {
        i64::try_from(self.poll_interval_seconds.saturating_mul(3))
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(TimeDelta::MAX)
    }
}

fn env_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    parse_or(key, env::var(key).ok(), default)
}

fn parse_or<T: FromStr>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(key, format!("cannot parse {raw:?}"))),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
