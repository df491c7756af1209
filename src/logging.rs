//! Structured logging for the umbrella service
//!
//! Provides context-rich logging with component and route-point identifiers
//! on top of `tracing`. Supports console output and an optional append-only
//! log file for scheduled runs.

use std::fmt;
use std::fs::OpenOptions;
use std::sync::Mutex;

use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, Layer, fmt as tracing_fmt};

use crate::model::{AssessError, AssessmentResult};

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    /// Parses `debug`, `info`, `warn`/`warning` or `error`, case-insensitively.
    pub fn parse(level: &str) -> Option<Self> {
        match level.to_ascii_lowercase().as_str() {
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warning),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }

    fn directive(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

// ---------------------------------------------------------------------------
// Components
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Forecast,
    Assess,
    Notify,
    Config,
    System,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Component::Forecast => write!(f, "FORECAST"),
            Component::Assess => write!(f, "ASSESS"),
            Component::Notify => write!(f, "NOTIFY"),
            Component::Config => write!(f, "CONFIG"),
            Component::System => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureType {
    /// Expected - e.g. the work day is already over
    Expected,
    /// Unexpected - indicates service degradation or configuration issue
    Unexpected,
    /// Unknown - cannot determine if this is expected or not
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Expected => write!(f, "EXPECTED"),
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
            FailureType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

// ---------------------------------------------------------------------------
// Logger Setup
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum LogInitError {
    #[error("cannot open log file {path}: {source}")]
    File {
        path: String,
        source: std::io::Error,
    },
    #[error("logger already initialized: {0}")]
    AlreadyInitialized(#[from] TryInitError),
}

/// Installs the global subscriber.
///
/// `RUST_LOG` overrides `min_level` when set. When `log_file` is given,
/// every event is also appended there, without colours and always with a
/// timestamp.
pub fn init_logger(
    min_level: LogLevel,
    log_file: Option<&str>,
    console_timestamps: bool,
) -> Result<(), LogInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(min_level.directive()));

    let console = tracing_fmt::layer().with_target(false);
    let console = if console_timestamps {
        console.boxed()
    } else {
        console.without_time().boxed()
    };

    let file = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|source| LogInitError::File {
                    path: path.to_string(),
                    source,
                })?;
            Some(
                tracing_fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

/// Log a general informational message
pub fn info(source: Component, point: Option<&str>, message: &str) {
    tracing::info!(source = %source, point = point.unwrap_or("-"), "{}", message);
}

/// Log a warning message
pub fn warn(source: Component, point: Option<&str>, message: &str) {
    tracing::warn!(source = %source, point = point.unwrap_or("-"), "{}", message);
}

/// Log an error message
pub fn error(source: Component, point: Option<&str>, message: &str) {
    tracing::error!(source = %source, point = point.unwrap_or("-"), "{}", message);
}

/// Log a debug message
pub fn debug(source: Component, point: Option<&str>, message: &str) {
    tracing::debug!(source = %source, point = point.unwrap_or("-"), "{}", message);
}

// ---------------------------------------------------------------------------
// Structured Failure Logging
// ---------------------------------------------------------------------------

/// Classify an assessment failure
pub fn classify_assess_failure(err: &AssessError) -> FailureType {
    match err {
        AssessError::NoForecastData => FailureType::Expected,
        AssessError::FetchExhausted { last_failure, .. } if last_failure.contains("HTTP 4") => {
            // a 4xx on every attempt usually means a bad key or coordinates
            FailureType::Unexpected
        }
        AssessError::FetchExhausted { .. } => FailureType::Unknown,
        AssessError::MalformedSample(_) | AssessError::MalformedResponse(_) => {
            FailureType::Unexpected
        }
        AssessError::EmptyRoute => FailureType::Unexpected,
    }
}

/// Log an assessment failure with automatic classification
pub fn log_assess_failure(point: Option<&str>, operation: &str, err: &AssessError) {
    let failure_type = classify_assess_failure(err);
    let message = format!("{} failed [{}]: {}", operation, failure_type, err);

    match failure_type {
        FailureType::Expected => info(Component::Assess, point, &message),
        FailureType::Unexpected => error(Component::Assess, point, &message),
        FailureType::Unknown => warn(Component::Assess, point, &message),
    }
}

// ---------------------------------------------------------------------------
// Summary Logging
// ---------------------------------------------------------------------------

/// Log the outcome of an assessment, with every triggering sample at debug
/// level in case the recommendation turns out to be wrong.
pub fn log_assessment_summary(result: &AssessmentResult, threshold: f64) {
    info(
        Component::Assess,
        None,
        &format!("Umbrella required? {}", result.umbrella_required),
    );
    if result.umbrella_required {
        info(
            Component::Assess,
            None,
            &format!(
                "{} samples were over the threshold of {}",
                result.triggering_samples.len(),
                threshold
            ),
        );
        for sample in &result.triggering_samples {
            debug(Component::Assess, None, &sample.to_string());
        }
    }
    info(
        Component::Assess,
        None,
        &format!(
            "Low: {:.2}, High: {:.2}",
            result.low_temperature, result.high_temperature
        ),
    );
}
