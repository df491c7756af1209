//! Dark Sky forecast API client
//!
//! Retrieves hourly forecasts for a coordinate and turns the raw `hourly.data`
//! records into [`HourlySample`]s.
//!
//! Requests always ask for `uk2` units: precipitation intensity in mm/h and
//! temperatures in °C, which is what the scoring and the notification text
//! assume.
//!
//! API Documentation: https://darksky.net/dev/docs

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::ingest::retry::StatusResponse;
use crate::model::{AssessError, HourlySample, RoutePoint};

pub const DARK_SKY_BASE_URL: &str = "https://api.darksky.net";

/// Per-request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 3;

const EXCLUDED_BLOCKS: &str = "currently,minutely,daily,alerts,flags";
const UNITS: &str = "uk2";

// ============================================================================
// Client seam
// ============================================================================

/// Transport-level failure of a single forecast request.
#[derive(Debug, Error)]
pub enum ForecastError {
    /// A request that failed in flight; `url` has the API key masked.
    #[error("request to {url} failed: {source}")]
    Request { url: String, source: reqwest::Error },
    #[error("{0}")]
    Transport(String),
}

/// The raw outcome of one forecast request.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastResponse {
    pub status: u16,
    pub url: String,
    pub body: String,
}

impl StatusResponse for ForecastResponse {
    fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    fn describe(&self) -> String {
        format!("{} (HTTP {})", self.url, self.status)
    }
}

/// Issues one forecast request per call. Implementations must be idempotent.
pub trait ForecastClient {
    fn request(&self, point: &RoutePoint) -> Result<ForecastResponse, ForecastError>;
}

impl<C: ForecastClient + ?Sized> ForecastClient for &C {
    fn request(&self, point: &RoutePoint) -> Result<ForecastResponse, ForecastError> {
        (**self).request(point)
    }
}

// ============================================================================
// Dark Sky over HTTP
// ============================================================================

/// Blocking Dark Sky client; the underlying connection pool is reused
/// across route points.
#[derive(Debug, Clone)]
pub struct DarkSkyClient {
    http: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
}

impl DarkSkyClient {
    pub fn new(api_key: &str, base_url: &str, timeout: Duration) -> Result<Self, ForecastError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ForecastError::Transport(e.without_url().to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn endpoint(&self, point: &RoutePoint) -> String {
        format!(
            "{}/forecast/{}/{},{}",
            self.base_url, self.api_key, point.latitude, point.longitude
        )
    }

    /// Replaces the API key so `text` is safe to log or notify.
    fn mask_key(&self, text: &str) -> String {
        if self.api_key.is_empty() {
            return text.to_string();
        }
        text.replace(&self.api_key, "<key>")
    }

    /// reqwest errors embed the request URL, and with it the key.
    fn request_failed(&self, endpoint: &str, e: reqwest::Error) -> ForecastError {
        ForecastError::Request {
            url: self.mask_key(endpoint),
            source: e.without_url(),
        }
    }
}

impl ForecastClient for DarkSkyClient {
    fn request(&self, point: &RoutePoint) -> Result<ForecastResponse, ForecastError> {
        let endpoint = self.endpoint(point);
        let response = self
            .http
            .get(&endpoint)
            .query(&[("exclude", EXCLUDED_BLOCKS), ("units", UNITS)])
            .header("Accept", "application/json")
            .send()
            .map_err(|e| self.request_failed(&endpoint, e))?;

        let status = response.status().as_u16();
        let url = self.mask_key(response.url().as_str());
        let body = response
            .text()
            .map_err(|e| self.request_failed(&endpoint, e))?;

        Ok(ForecastResponse { status, url, body })
    }
}

/// Link to the human-readable forecast page for a point, in `uk2` units.
pub fn forecast_page_url(point: &RoutePoint) -> String {
    format!("https://darksky.net/forecast/{}/uk224/en", point)
}

// ============================================================================
// Response parsing
// ============================================================================

/// Extracts the `hourly.data` records from a forecast body.
pub fn hourly_records(body: &str) -> Result<Vec<Value>, AssessError> {
    let mut json: Value =
        serde_json::from_str(body).map_err(|e| AssessError::MalformedResponse(e.to_string()))?;

    match json.pointer_mut("/hourly/data").map(Value::take) {
        Some(Value::Array(records)) => Ok(records),
        Some(_) => Err(AssessError::MalformedResponse("hourly.data is not an array".into())),
        None => Err(AssessError::MalformedResponse("missing hourly.data".into())),
    }
}

/// One entry of `hourly.data[]`; fields the service does not use are ignored.
#[derive(Debug, Deserialize)]
pub struct HourlyRecord {
    /// Unix seconds, UTC. Usually an integer, but fractions are accepted.
    pub time: f64,
    #[serde(rename = "precipProbability")]
    pub precip_probability: f64,
    #[serde(rename = "precipIntensity")]
    pub precip_intensity: f64,
    #[serde(rename = "apparentTemperature")]
    pub apparent_temperature: f64,
}

/// Parses one hourly record into a sample.
///
/// `time` is Unix seconds and is read as UTC. Intensity is assumed to be in
/// mm/h; units are not validated here.
pub fn parse_sample(record: &Value) -> Result<HourlySample, AssessError> {
    let parsed = HourlyRecord::deserialize(record)
        .map_err(|e| AssessError::MalformedSample(format!("{} in {}", e, record)))?;

    Ok(HourlySample {
        time: epoch_seconds(parsed.time)?,
        precip_probability: parsed.precip_probability,
        precip_intensity: parsed.precip_intensity,
        apparent_temperature: parsed.apparent_temperature,
    })
}

fn epoch_seconds(time: f64) -> Result<DateTime<Utc>, AssessError> {
    let out_of_range = || AssessError::MalformedSample(format!("time {} out of range", time));
    if !time.is_finite() || time.abs() > i64::MAX as f64 {
        return Err(out_of_range());
    }

    let secs = time.floor();
    // sub-second part, at most 999_999_999 after the clamp
    let nanos = (((time - secs) * 1e9).round() as u32).min(999_999_999);
    DateTime::from_timestamp(secs as i64, nanos).ok_or_else(out_of_range)
}

// ============================================================================
// Tests
// ============================================================================
