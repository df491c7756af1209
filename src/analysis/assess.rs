//! Route assessment: the once-per-run umbrella decision.
//!
//! For every point along the route, in order, the forecast is fetched
//! through the retry loop, each hourly record parsed, and hours outside the
//! remainder of today's working day dropped. The surviving hours from all
//! points are then scored together.
//!
//! Any failure aborts the whole run; a partially assessed route is not
//! trusted.

use chrono::{DateTime, Utc};

use crate::alert::thresholds::samples_over_threshold;
use crate::ingest::darksky::{ForecastClient, hourly_records, parse_sample};
use crate::ingest::retry::{RetryingFetcher, Sleeper, ThreadSleeper};
use crate::logging;
use crate::logging::Component;
use crate::model::{AssessError, AssessmentResult, HourlySample, RoutePoint, WorkWindow};

/// Drives fetching, parsing, filtering and scoring for a route.
pub struct RouteAssessor<C, S = ThreadSleeper> {
    client: C,
    fetcher: RetryingFetcher<S>,
}

impl<C: ForecastClient, S: Sleeper> RouteAssessor<C, S> {
    pub fn new(client: C, fetcher: RetryingFetcher<S>) -> Self {
        Self { client, fetcher }
    }

    /// Decides whether an umbrella is needed for the rest of today.
    ///
    /// Every failure is logged here, once, before it is returned.
    ///
    /// # Errors
    /// - [`AssessError::EmptyRoute`] before any request when `route` is empty.
    /// - [`AssessError::FetchExhausted`], [`AssessError::MalformedResponse`]
    ///   or [`AssessError::MalformedSample`] from the first point that fails.
    /// - [`AssessError::NoForecastData`] when no hour survives filtering.
    pub fn assess(
        &self,
        route: &[RoutePoint],
        now: DateTime<Utc>,
        window: &WorkWindow,
        threshold: f64,
    ) -> Result<AssessmentResult, AssessError> {
        if route.is_empty() {
            let err = AssessError::EmptyRoute;
            logging::log_assess_failure(None, "Assessment", &err);
            return Err(err);
        }

        let mut samples = Vec::new();
        for point in route {
            let point_samples = self.relevant_samples(point, now, window).inspect_err(|e| {
                logging::log_assess_failure(Some(&point.to_string()), "Forecast", e)
            })?;
            samples.extend(point_samples);
        }

        aggregate(samples, threshold)
            .inspect_err(|e| logging::log_assess_failure(None, "Assessment", e))
    }

    fn relevant_samples(
        &self,
        point: &RoutePoint,
        now: DateTime<Utc>,
        window: &WorkWindow,
    ) -> Result<Vec<HourlySample>, AssessError> {
        let label = point.to_string();
        logging::debug(Component::Forecast, Some(&label), "Asking for hourly forecast");

        let response = self.fetcher.fetch(|| self.client.request(point))?;
        let records = hourly_records(&response.body)?;

        let mut samples = Vec::with_capacity(records.len());
        for record in &records {
            let sample = parse_sample(record)?;
            if window.contains(sample.time, now) {
                samples.push(sample);
            }
        }

        logging::debug(
            Component::Forecast,
            Some(&label),
            &format!("{} of {} hours fall in the work window", samples.len(), records.len()),
        );
        Ok(samples)
    }
}

/// Scores the in-window samples of the whole route.
///
/// Fails with [`AssessError::NoForecastData`] when `samples` is empty.
pub fn aggregate(samples: Vec<HourlySample>, threshold: f64) -> Result<AssessmentResult, AssessError> {
    let first = samples.first().ok_or(AssessError::NoForecastData)?;

    let (low_temperature, high_temperature) = samples.iter().fold(
        (first.apparent_temperature, first.apparent_temperature),
        |(low, high), sample| {
            (
                low.min(sample.apparent_temperature),
                high.max(sample.apparent_temperature),
            )
        },
    );

    let triggering_samples = samples_over_threshold(&samples, threshold);
    let result = AssessmentResult {
        umbrella_required: !triggering_samples.is_empty(),
        triggering_samples,
        low_temperature,
        high_temperature,
    };

    logging::log_assessment_summary(&result, threshold);
    Ok(result)
}
