//! Core data types for the umbrella forecast service.
//!
//! This module defines the shared domain model imported by all other modules:
//! hourly forecast samples, route points, the work window and the assessment
//! outcome, plus the error taxonomy of an assessment run.

use chrono::{DateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::Deserialize;
use std::fmt;
use thiserror::Error;

use crate::analysis::score::umbrella_score;

// ---------------------------------------------------------------------------
// Forecast samples
// ---------------------------------------------------------------------------

/// The forecast for a single one-hour period at one location.
///
/// Corresponds to one entry in the `hourly.data[]` array of a Dark Sky
/// forecast response requested in `uk2` units.
#[derive(Debug, Clone, PartialEq)]
pub struct HourlySample {
    /// Start of the one-hour forecast period.
    pub time: DateTime<Utc>,
    /// Probability of precipitation, between 0 and 1 inclusive.
    pub precip_probability: f64,
    /// Liquid-equivalent precipitation in millimetres per hour.
    pub precip_intensity: f64,
    /// "Feels-like" temperature in degrees Celsius.
    pub apparent_temperature: f64,
}

impl HourlySample {
    /// How strongly this hour calls for an umbrella, in `[0, 1)`.
    pub fn umbrella_score(&self) -> f64 {
        umbrella_score(self.precip_probability, self.precip_intensity)
    }
}

impl fmt::Display for HourlySample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "HourlySample({}, {} mm, P(precip) = {}, score = {:.3}, {}°C)",
            self.time,
            self.precip_intensity,
            self.precip_probability,
            self.umbrella_score(),
            self.apparent_temperature
        )
    }
}

// ---------------------------------------------------------------------------
// Route and work window
// ---------------------------------------------------------------------------

/// One location along the commute whose forecast is checked.
///
/// Deserializes from a `[latitude, longitude]` pair, which is how routes are
/// written in both the TOML config and the `ROUTE` environment variable.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(from = "(f64, f64)")]
pub struct RoutePoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl RoutePoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

impl From<(f64, f64)> for RoutePoint {
    fn from((latitude, longitude): (f64, f64)) -> Self {
        Self::new(latitude, longitude)
    }
}

impl fmt::Display for RoutePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.latitude, self.longitude)
    }
}

/// The working-day span, as times of day in a fixed timezone.
///
/// Sample times are always converted into `timezone` before comparison,
/// regardless of the offset they were reported in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkWindow {
    pub begin: NaiveTime,
    pub end: NaiveTime,
    pub timezone: Tz,
}

// ---------------------------------------------------------------------------
// Assessment outcome
// ---------------------------------------------------------------------------

/// The umbrella decision for the remainder of today's working day.
#[derive(Debug, Clone, PartialEq)]
pub struct AssessmentResult {
    pub umbrella_required: bool,
    /// Samples whose score met or exceeded the threshold, in route order.
    pub triggering_samples: Vec<HourlySample>,
    /// Lowest apparent temperature across every in-window sample.
    pub low_temperature: f64,
    /// Highest apparent temperature across every in-window sample.
    pub high_temperature: f64,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that abort an assessment run.
#[derive(Debug, Error, PartialEq)]
pub enum AssessError {
    /// The configured route has no points; raised before any request.
    #[error("The route must contain at least one location")]
    EmptyRoute,

    /// Every attempt to fetch one route point's forecast failed.
    #[error("Request failed after {attempts} attempts: {last_failure}")]
    FetchExhausted { attempts: u32, last_failure: String },

    /// A forecast record is missing a field or has a non-numeric value.
    #[error("Malformed forecast sample: {0}")]
    MalformedSample(String),

    /// The forecast body is not JSON or has no `hourly.data` array.
    #[error("Malformed forecast response: {0}")]
    MalformedResponse(String),

    /// Fetching succeeded but no forecast hour is left in today's work window.
    #[error("There are no more working hours today")]
    NoForecastData,
}

impl AssessError {
    /// `true` when the run found nothing to assess rather than failing.
    pub fn is_nothing_to_report(&self) -> bool {
        matches!(self, AssessError::NoForecastData)
    }
}
