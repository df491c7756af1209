//! Service configuration.
//!
//! Configuration is read once, before any forecast is fetched, either from a
//! TOML file or entirely from environment variables. Secrets always come
//! from the environment (after loading `.env`) and override anything in the
//! file, so the file can be committed.
//!
//! ```toml
//! timezone = "Europe/London"
//! day_begin = "08:00"
//! day_end = "18:00"
//! score_threshold = 0.5
//! route = [[51.5, -0.1], [51.52, -0.08]]
//!
//! [retry]
//! attempts = 3
//! gap_secs = 60
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use chrono::NaiveTime;
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer};
use thiserror::Error;

use crate::alert::notify::PUSHOVER_BASE_URL;
use crate::ingest::darksky::{DARK_SKY_BASE_URL, DEFAULT_TIMEOUT_SECS};
use crate::ingest::retry::{DEFAULT_ATTEMPTS, DEFAULT_GAP_SECS, RetryPolicy};
use crate::logging::LogLevel;
use crate::model::{RoutePoint, WorkWindow};

pub const DARK_SKY_KEY_VAR: &str = "DARK_SKY_SECRET_KEY";
pub const PUSHOVER_TOKEN_VAR: &str = "PUSHOVER_APP_TOKEN";
pub const PUSHOVER_USER_VAR: &str = "PUSHOVER_USER_KEY";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid config file: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("environment variable {0} must be set")]
    Missing(&'static str),
    #[error("environment variable {name} is invalid: {message}")]
    InvalidVar { name: &'static str, message: String },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

// ---------------------------------------------------------------------------
// Configuration types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// IANA timezone all work-day times are evaluated in.
    pub timezone: Tz,
    #[serde(deserialize_with = "time_of_day")]
    pub day_begin: NaiveTime,
    #[serde(deserialize_with = "time_of_day")]
    pub day_end: NaiveTime,
    /// Ordered commute points; the first one is linked from notifications.
    pub route: Vec<RoutePoint>,
    /// At or above this score an umbrella is recommended.
    pub score_threshold: f64,
    #[serde(default)]
    pub retry: RetrySettings,
    #[serde(default)]
    pub forecast: ForecastSettings,
    #[serde(default)]
    pub pushover: PushoverSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub attempts: u32,
    pub gap_secs: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
            gap_secs: DEFAULT_GAP_SECS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ForecastSettings {
    pub api_key: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ForecastSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DARK_SKY_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PushoverSettings {
    pub app_token: String,
    pub user_key: String,
    pub base_url: String,
}

impl Default for PushoverSettings {
    fn default() -> Self {
        Self {
            app_token: String::new(),
            user_key: String::new(),
            base_url: PUSHOVER_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    /// Append-only log file, in addition to the console.
    pub file: Option<String>,
    pub console_timestamps: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            console_timestamps: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Config {
    /// Loads `.env`, then the TOML file at `path`, then secret overrides from
    /// the environment, and validates the result.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let mut config = Self::from_toml_str(&text)?;
        config.apply_secrets(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parses a TOML document without consulting the environment or
    /// validating.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Loads `.env`, then builds and validates the configuration from
    /// environment variables alone.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from `TIMEZONE`, `DAY_BEGIN_HOUR`,
    /// `DAY_END_HOUR`, `ROUTE` (JSON `[[lat, long], ...]`) and
    /// `SCORE_THRESHOLD`, plus optional `RETRY_ATTEMPTS`, `RETRY_GAP_SECS`,
    /// `LOG_LEVEL`, `LOG_FILE` and the secrets.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| lookup(name).ok_or(ConfigError::Missing(name));

        let timezone = parse_var("TIMEZONE", &required("TIMEZONE")?)?;
        let day_begin = hour_var("DAY_BEGIN_HOUR", &required("DAY_BEGIN_HOUR")?)?;
        let day_end = hour_var("DAY_END_HOUR", &required("DAY_END_HOUR")?)?;
        let route: Vec<RoutePoint> =
            serde_json::from_str(&required("ROUTE")?).map_err(|e| ConfigError::InvalidVar {
                name: "ROUTE",
                message: e.to_string(),
            })?;
        let score_threshold = parse_var("SCORE_THRESHOLD", &required("SCORE_THRESHOLD")?)?;

        let mut retry = RetrySettings::default();
        if let Some(attempts) = lookup("RETRY_ATTEMPTS") {
            retry.attempts = parse_var("RETRY_ATTEMPTS", &attempts)?;
        }
        if let Some(gap) = lookup("RETRY_GAP_SECS") {
            retry.gap_secs = parse_var("RETRY_GAP_SECS", &gap)?;
        }

        let mut logging = LoggingSettings::default();
        if let Some(level) = lookup("LOG_LEVEL") {
            logging.level = level;
        }
        logging.file = lookup("LOG_FILE");

        let mut config = Config {
            timezone,
            day_begin,
            day_end,
            route,
            score_threshold,
            retry,
            forecast: ForecastSettings::default(),
            pushover: PushoverSettings::default(),
            logging,
        };
        config.apply_secrets(&lookup);
        config.validate()?;
        Ok(config)
    }

    /// Overrides credentials with any that are set in the environment.
    pub fn apply_secrets<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(DARK_SKY_KEY_VAR) {
            self.forecast.api_key = key;
        }
        if let Some(token) = lookup(PUSHOVER_TOKEN_VAR) {
            self.pushover.app_token = token;
        }
        if let Some(user) = lookup(PUSHOVER_USER_VAR) {
            self.pushover.user_key = user;
        }
    }

    /// Checks every invariant the assessment relies on, reporting all
    /// problems at once.
    ///
    /// An empty route passes: the assessor rejects it, so the run still
    /// ends with a failure notification.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        for (i, point) in self.route.iter().enumerate() {
            if !(-90.0..=90.0).contains(&point.latitude) || !(-180.0..=180.0).contains(&point.longitude) {
                errors.push(format!("route[{}]: {} is not a valid coordinate", i, point));
            }
        }
        if !(0.0..=1.0).contains(&self.score_threshold) {
            errors.push(format!(
                "score_threshold: {} is outside [0, 1]",
                self.score_threshold
            ));
        }
        if self.day_begin > self.day_end {
            errors.push(format!(
                "day_begin: {} is after day_end {}",
                self.day_begin, self.day_end
            ));
        }
        if self.retry.attempts == 0 {
            errors.push("retry.attempts: must be at least 1".to_string());
        }
        if !self.retry.gap_secs.is_finite() || self.retry.gap_secs < 0.0 {
            errors.push(format!(
                "retry.gap_secs: {} is not a valid delay",
                self.retry.gap_secs
            ));
        }
        if self.forecast.api_key.is_empty() {
            errors.push(format!("forecast.api_key: set it or {}", DARK_SKY_KEY_VAR));
        }
        if LogLevel::parse(&self.logging.level).is_none() {
            errors.push(format!("logging.level: unknown level {}", self.logging.level));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(errors.join("; ")))
        }
    }

    pub fn work_window(&self) -> WorkWindow {
        WorkWindow {
            begin: self.day_begin,
            end: self.day_end,
            timezone: self.timezone,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.retry.attempts,
            gap: Duration::try_from_secs_f64(self.retry.gap_secs).unwrap_or_default(),
        }
    }

    pub fn log_level(&self) -> LogLevel {
        LogLevel::parse(&self.logging.level).unwrap_or(LogLevel::Info)
    }

    pub fn pushover_configured(&self) -> bool {
        !self.pushover.app_token.is_empty() && !self.pushover.user_key.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

/// Accepts `HH:MM` or `HH:MM:SS`.
fn parse_time_of_day(text: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(text, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M"))
        .ok()
}

fn time_of_day<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    parse_time_of_day(&text)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid time of day `{}`", text)))
}

fn parse_var<T>(name: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::InvalidVar {
        name,
        message: e.to_string(),
    })
}

fn hour_var(name: &'static str, value: &str) -> Result<NaiveTime, ConfigError> {
    let hour: u32 = parse_var(name, value)?;
    NaiveTime::from_hms_opt(hour, 0, 0).ok_or_else(|| ConfigError::InvalidVar {
        name,
        message: format!("{} is not an hour of the day", hour),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
