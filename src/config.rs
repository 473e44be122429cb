use anyhow::{Result, anyhow};
use serde::Deserialize;
use std::env;
use std::str::FromStr;
use tracing::{info, warn};

use crate::matcher::ToleranceProfile;

// Import logging macros
use crate::{log_system_event, log_validation};

/// Complete application configuration loaded from environment variables
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    pub schedule: SchedulePolicy,
    pub recognition: RecognitionConfig,
    pub review: ReviewPolicy,
    pub logging: LoggingConfig,
    pub content: ContentConfig,
}

/// Largest interval any policy may configure: one thousand years.
pub const MAX_INTERVAL_LIMIT_SECS: f64 = 31_536_000_000.0;

/// Spaced-repetition tuning. Intervals are in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct SchedulePolicy {
    /// Multiplier applied to the interval after a success; must exceed 1.
    pub growth_factor: f64,
    /// Floor for the interval after a success.
    pub minimum_interval_secs: f64,
    /// Ceiling for the interval after a success.
    pub maximum_interval_secs: f64,
    /// Interval an item is reset to after a failure.
    pub failure_interval_secs: f64,
    /// Look-ahead when deciding whether an item is due.
    pub due_slack_secs: i64,
}

impl Default for SchedulePolicy {
    fn default() -> Self {
        Self {
            growth_factor: 2.5,
            minimum_interval_secs: 86_400.0,
            maximum_interval_secs: 315_360_000.0,
            failure_interval_secs: 600.0,
            due_slack_secs: 60,
        }
    }
}

/// Stroke recognition tuning
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct RecognitionConfig {
    pub tolerance: ToleranceProfile,
    /// Failed attempts on one stroke before the reference is revealed.
    pub reveal_after: u32,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            tolerance: ToleranceProfile::default(),
            reveal_after: 3,
        }
    }
}

/// How a finished presentation is timed and graded
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ReviewPolicy {
    pub review_time_limit_secs: i64,
    pub thinking_time_limit_secs: i64,
    /// Share of judged units that may fail while the review still counts as a success.
    pub allowed_failure_ratio: f64,
}

impl Default for ReviewPolicy {
    fn default() -> Self {
        Self {
            review_time_limit_secs: 30,
            thinking_time_limit_secs: 15,
            allowed_failure_ratio: 0.25,
        }
    }
}

/// Logging system configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file_enabled: bool,
    pub console_enabled: bool,
    pub log_directory: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info,glyph_trainer=debug".to_string(),
            file_enabled: true,
            console_enabled: true,
            log_directory: "logs".to_string(),
        }
    }
}

/// Where the driver binary reads its content snapshot from
#[derive(Debug, Clone, Deserialize)]
pub struct ContentConfig {
    pub path: String,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            path: "content.json".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables with sensible defaults
    pub fn from_env() -> Result<Self> {
        log_system_event!(config, "Loading application configuration from environment variables");

        let config = Config {
            schedule: SchedulePolicy::from_env()?,
            recognition: RecognitionConfig::from_env()?,
            review: ReviewPolicy::from_env()?,
            logging: LoggingConfig::from_env()?,
            content: ContentConfig::from_env()?,
        };

        log_system_event!(config, "Configuration loaded successfully");
        config.log_configuration_summary();

        Ok(config)
    }

    fn log_configuration_summary(&self) {
        info!(
            growth_factor = self.schedule.growth_factor,
            minimum_interval_secs = self.schedule.minimum_interval_secs,
            maximum_interval_secs = self.schedule.maximum_interval_secs,
            failure_interval_secs = self.schedule.failure_interval_secs,
            distance_tolerance = self.recognition.tolerance.distance,
            angle_tolerance = self.recognition.tolerance.angle_degrees,
            content_path = %self.content.path,
            log_level = %self.logging.level,
            "Configuration summary"
        );
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let schedule = &self.schedule;
        if !(schedule.growth_factor > 1.0) {
            return Err(anyhow!(
                "SCHEDULE_GROWTH_FACTOR must be greater than 1, got {}",
                schedule.growth_factor
            ));
        }
        if !(schedule.minimum_interval_secs > 0.0) || !(schedule.failure_interval_secs > 0.0) {
            return Err(anyhow!("Schedule intervals must be positive"));
        }
        if !(schedule.maximum_interval_secs >= schedule.minimum_interval_secs)
            || schedule.maximum_interval_secs > MAX_INTERVAL_LIMIT_SECS
        {
            return Err(anyhow!(
                "SCHEDULE_MAX_INTERVAL_SECS must be between SCHEDULE_MIN_INTERVAL_SECS and {}, got {}",
                MAX_INTERVAL_LIMIT_SECS,
                schedule.maximum_interval_secs
            ));
        }
        if schedule.due_slack_secs < 0 {
            return Err(anyhow!("SCHEDULE_DUE_SLACK_SECS cannot be negative"));
        }

        let tolerance = &self.recognition.tolerance;
        if !(tolerance.distance > 0.0 && tolerance.distance <= 1.0) {
            return Err(anyhow!("RECOGNITION_DISTANCE_TOLERANCE must be in (0, 1]"));
        }
        if !(tolerance.angle_degrees > 0.0 && tolerance.angle_degrees <= 180.0) {
            return Err(anyhow!("RECOGNITION_ANGLE_TOLERANCE must be in (0, 180]"));
        }

        if !(0.0..=1.0).contains(&self.review.allowed_failure_ratio) {
            return Err(anyhow!("REVIEW_ALLOWED_FAILURE_RATIO must be in [0, 1]"));
        }
        if self.review.review_time_limit_secs <= 0 || self.review.thinking_time_limit_secs <= 0 {
            return Err(anyhow!("Review time limits must be positive"));
        }

        if schedule.failure_interval_secs > schedule.minimum_interval_secs {
            warn!(
                "Failure interval {}s exceeds minimum success interval {}s",
                schedule.failure_interval_secs, schedule.minimum_interval_secs
            );
        }

        log_validation!(success, "configuration", "Configuration validation completed successfully");
        Ok(())
    }
}

impl SchedulePolicy {
    fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(SchedulePolicy {
            growth_factor: env_or("SCHEDULE_GROWTH_FACTOR", defaults.growth_factor)?,
            minimum_interval_secs: env_or("SCHEDULE_MIN_INTERVAL_SECS", defaults.minimum_interval_secs)?,
            maximum_interval_secs: env_or("SCHEDULE_MAX_INTERVAL_SECS", defaults.maximum_interval_secs)?,
            failure_interval_secs: env_or("SCHEDULE_FAILURE_INTERVAL_SECS", defaults.failure_interval_secs)?,
            due_slack_secs: env_or("SCHEDULE_DUE_SLACK_SECS", defaults.due_slack_secs)?,
        })
    }
}

impl RecognitionConfig {
    fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(RecognitionConfig {
            tolerance: ToleranceProfile {
                distance: env_or("RECOGNITION_DISTANCE_TOLERANCE", defaults.tolerance.distance)?,
                angle_degrees: env_or("RECOGNITION_ANGLE_TOLERANCE", defaults.tolerance.angle_degrees)?,
            },
            reveal_after: env_or("RECOGNITION_REVEAL_AFTER", defaults.reveal_after)?,
        })
    }
}

impl ReviewPolicy {
    fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(ReviewPolicy {
            review_time_limit_secs: env_or("REVIEW_TIME_LIMIT_SECS", defaults.review_time_limit_secs)?,
            thinking_time_limit_secs: env_or("THINKING_TIME_LIMIT_SECS", defaults.thinking_time_limit_secs)?,
            allowed_failure_ratio: env_or("REVIEW_ALLOWED_FAILURE_RATIO", defaults.allowed_failure_ratio)?,
        })
    }
}

impl LoggingConfig {
    fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let level = env::var("RUST_LOG").unwrap_or(defaults.level);

        let file_enabled = env::var("LOG_FILE_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse::<bool>()
            .unwrap_or(true);

        let console_enabled = env::var("LOG_CONSOLE_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse::<bool>()
            .unwrap_or(true);

        let log_directory = env::var("LOG_DIRECTORY").unwrap_or(defaults.log_directory);

        Ok(LoggingConfig {
            level,
            file_enabled,
            console_enabled,
            log_directory,
        })
    }
}

impl ContentConfig {
    fn from_env() -> Result<Self> {
        let path = env::var("CONTENT_PATH").unwrap_or_else(|_| ContentConfig::default().path);
        Ok(ContentConfig { path })
    }
}

/// Read `key` and parse it, falling back to `default` when unset.
fn env_or<T: FromStr>(key: &str, default: T) -> Result<T> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| anyhow!("Invalid {} value: '{}'", key, raw)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.schedule.growth_factor, 2.5);
        assert_eq!(config.recognition.reveal_after, 3);
        assert_eq!(config.review.review_time_limit_secs, 30);
    }

    #[test]
    fn test_env_or_parses_and_falls_back() {
        unsafe { env::remove_var("GLYPH_TEST_UNSET_VALUE"); }
        assert_eq!(env_or("GLYPH_TEST_UNSET_VALUE", 7u32).unwrap(), 7);

        unsafe { env::set_var("GLYPH_TEST_NUMERIC_VALUE", " 12 "); }
        assert_eq!(env_or("GLYPH_TEST_NUMERIC_VALUE", 0u32).unwrap(), 12);

        unsafe { env::set_var("GLYPH_TEST_BAD_VALUE", "twelve"); }
        assert!(env_or("GLYPH_TEST_BAD_VALUE", 0u32).is_err());

        unsafe {
            env::remove_var("GLYPH_TEST_NUMERIC_VALUE");
            env::remove_var("GLYPH_TEST_BAD_VALUE");
        }
    }

    #[test]
    fn test_config_validation() {
        let config = Config::default();

        let mut invalid = config.clone();
        invalid.schedule.growth_factor = 1.0;
        assert!(invalid.validate().is_err());

        let mut invalid = config.clone();
        invalid.schedule.failure_interval_secs = 0.0;
        assert!(invalid.validate().is_err());

        let mut invalid = config.clone();
        invalid.schedule.maximum_interval_secs = 3_600.0;
        assert!(invalid.validate().is_err());

        let mut invalid = config.clone();
        invalid.schedule.maximum_interval_secs = f64::INFINITY;
        assert!(invalid.validate().is_err());

        let mut invalid = config.clone();
        invalid.recognition.tolerance.angle_degrees = 270.0;
        assert!(invalid.validate().is_err());

        let mut invalid = config.clone();
        invalid.review.allowed_failure_ratio = 1.5;
        assert!(invalid.validate().is_err());

        let mut invalid = config;
        invalid.schedule.growth_factor = f64::NAN;
        assert!(invalid.validate().is_err());
    }
}
