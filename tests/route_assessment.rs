//! End-to-end route assessment tests
//!
//! Drive `RouteAssessor` with a scripted forecast client serving canned
//! Dark Sky bodies, so fetching, parsing, filtering, scoring and aggregation
//! run together without network access.
//!
//! All tests share a fixed clock: 2024-05-01 07:30 BST (06:30 UTC), with a
//! London work window of 08:00 to 18:00.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Europe::London;
use serde_json::json;

use umbrella_service::ingest::darksky::{ForecastClient, ForecastError, ForecastResponse};
use umbrella_service::ingest::retry::{RetryPolicy, RetryingFetcher, Sleeper};
use umbrella_service::{AssessError, RouteAssessor, RoutePoint, WorkWindow};

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

/// Serves queued responses in order and records which points were asked for.
#[derive(Default)]
struct ScriptedClient {
    responses: RefCell<VecDeque<Result<ForecastResponse, String>>>,
    requested: RefCell<Vec<RoutePoint>>,
}

impl ScriptedClient {
    fn serving(bodies: Vec<String>) -> Self {
        let client = Self::default();
        for body in bodies {
            client.push_ok(body);
        }
        client
    }

    fn push_ok(&self, body: String) {
        self.responses.borrow_mut().push_back(Ok(ForecastResponse {
            status: 200,
            url: "scripted".to_string(),
            body,
        }));
    }

    fn push_status(&self, status: u16) {
        self.responses.borrow_mut().push_back(Ok(ForecastResponse {
            status,
            url: "scripted".to_string(),
            body: String::new(),
        }));
    }

    fn push_transport_error(&self, message: &str) {
        self.responses.borrow_mut().push_back(Err(message.to_string()));
    }
}

impl ForecastClient for ScriptedClient {
    fn request(&self, point: &RoutePoint) -> Result<ForecastResponse, ForecastError> {
        self.requested.borrow_mut().push(*point);
        self.responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err("no scripted response left".to_string()))
            .map_err(ForecastError::Transport)
    }
}

#[derive(Default)]
struct CountingSleeper {
    sleeps: RefCell<Vec<Duration>>,
}

impl Sleeper for CountingSleeper {
    fn sleep(&self, gap: Duration) {
        self.sleeps.borrow_mut().push(gap);
    }
}

fn assessor<'a>(
    client: &'a ScriptedClient,
    sleeper: &'a CountingSleeper,
) -> RouteAssessor<&'a ScriptedClient, &'a CountingSleeper> {
    let policy = RetryPolicy { attempts: 3, gap: Duration::from_secs(60) };
    RouteAssessor::new(client, RetryingFetcher::with_sleeper(policy, sleeper))
}

fn window() -> WorkWindow {
    WorkWindow {
        begin: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
        end: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
        timezone: London,
    }
}

fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 6, 30, 0).unwrap()
}

/// An hour on 1 May 2024, London time.
fn london_hour(hour: u32) -> DateTime<Utc> {
    London
        .with_ymd_and_hms(2024, 5, 1, hour, 0, 0)
        .unwrap()
        .with_timezone(&Utc)
}

/// A Dark Sky body with one record per `(time, probability, intensity, temperature)`.
fn forecast_body(hours: &[(DateTime<Utc>, f64, f64, f64)]) -> String {
    let data: Vec<_> = hours
        .iter()
        .map(|(time, probability, intensity, temperature)| {
            json!({
                "time": time.timestamp(),
                "summary": "Overcast",
                "precipIntensity": intensity,
                "precipProbability": probability,
                "apparentTemperature": temperature,
            })
        })
        .collect();
    json!({
        "latitude": 51.5,
        "longitude": -0.1,
        "timezone": "Europe/London",
        "hourly": { "summary": "Overcast all day.", "data": data }
    })
    .to_string()
}

/// Every hour of 1 May, London time, all dry at `temperature`.
fn dry_day(temperature: f64) -> Vec<(DateTime<Utc>, f64, f64, f64)> {
    (0..24).map(|h| (london_hour(h), 0.0, 0.0, temperature)).collect()
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn test_dry_route_needs_no_umbrella() {
    let mut hours = dry_day(15.0);
    // outside the window: must not affect the temperature range
    hours[3].3 = -5.0;
    hours[22].3 = 30.0;
    let tomorrow = London.with_ymd_and_hms(2024, 5, 2, 9, 0, 0).unwrap().with_timezone(&Utc);
    hours.push((tomorrow, 1.0, 10.0, 2.0));

    let client = ScriptedClient::serving(vec![forecast_body(&hours)]);
    let sleeper = CountingSleeper::default();

    let result = assessor(&client, &sleeper)
        .assess(&[RoutePoint::new(51.5, -0.1)], fixed_now(), &window(), 0.5)
        .expect("dry route should assess");

    assert!(!result.umbrella_required);
    assert!(result.triggering_samples.is_empty());
    assert_eq!(result.low_temperature, 15.0);
    assert_eq!(result.high_temperature, 15.0);
}

#[test]
fn test_one_wet_hour_triggers_umbrella() {
    let mut hours = dry_day(15.0);
    hours[13] = (london_hour(13), 0.9, 2.0, 11.0);

    let client = ScriptedClient::serving(vec![forecast_body(&hours)]);
    let sleeper = CountingSleeper::default();

    let result = assessor(&client, &sleeper)
        .assess(&[RoutePoint::new(51.5, -0.1)], fixed_now(), &window(), 0.5)
        .unwrap();

    assert!(result.umbrella_required);
    assert_eq!(result.triggering_samples.len(), 1);
    let trigger = &result.triggering_samples[0];
    assert_eq!(trigger.time, london_hour(13));
    assert!((trigger.umbrella_score() - 0.909).abs() < 1e-3);
    assert_eq!((result.low_temperature, result.high_temperature), (11.0, 15.0));
}

#[test]
fn test_point_with_only_past_hours_contributes_nothing() {
    let past: Vec<_> = (3..8).map(|h| (london_hour(h), 0.9, 5.0, 20.0)).collect();
    let mut second = past.clone();
    second.push((london_hour(9), 0.1, 0.0, 8.0));

    let client = ScriptedClient::serving(vec![forecast_body(&past), forecast_body(&second)]);
    let sleeper = CountingSleeper::default();
    let route = [RoutePoint::new(51.5, -0.1), RoutePoint::new(51.45, -0.2)];

    let result = assessor(&client, &sleeper)
        .assess(&route, fixed_now(), &window(), 0.5)
        .unwrap();

    assert_eq!(*client.requested.borrow(), route.to_vec(), "points visited in route order");
    assert!(!result.umbrella_required, "wet past hours must not count");
    assert_eq!(result.low_temperature, 8.0);
    assert_eq!(result.high_temperature, 8.0);
}

#[test]
fn test_triggering_samples_follow_route_order() {
    let first = vec![(london_hour(17), 0.8, 1.0, 9.0)];
    let second = vec![(london_hour(9), 1.0, 3.0, 7.0)];

    let client = ScriptedClient::serving(vec![forecast_body(&first), forecast_body(&second)]);
    let sleeper = CountingSleeper::default();
    let route = [RoutePoint::new(51.5, -0.1), RoutePoint::new(51.45, -0.2)];

    let result = assessor(&client, &sleeper)
        .assess(&route, fixed_now(), &window(), 0.5)
        .unwrap();

    let times: Vec<_> = result.triggering_samples.iter().map(|s| s.time).collect();
    assert_eq!(times, vec![london_hour(17), london_hour(9)]);
}

// ---------------------------------------------------------------------------
// Failure modes
// ---------------------------------------------------------------------------

#[test]
fn test_after_work_day_is_no_forecast_data() {
    let client = ScriptedClient::serving(vec![forecast_body(&dry_day(12.0))]);
    let sleeper = CountingSleeper::default();
    let evening = London.with_ymd_and_hms(2024, 5, 1, 19, 0, 0).unwrap().with_timezone(&Utc);

    let err = assessor(&client, &sleeper)
        .assess(&[RoutePoint::new(51.5, -0.1)], evening, &window(), 0.5)
        .unwrap_err();

    assert_eq!(err, AssessError::NoForecastData);
    assert!(err.is_nothing_to_report());
}

#[test]
fn test_empty_route_issues_no_request() {
    let client = ScriptedClient::default();
    let sleeper = CountingSleeper::default();

    let err = assessor(&client, &sleeper)
        .assess(&[], fixed_now(), &window(), 0.5)
        .unwrap_err();

    assert_eq!(err, AssessError::EmptyRoute);
    assert!(client.requested.borrow().is_empty());
}

#[test]
fn test_transient_failures_are_retried() {
    let client = ScriptedClient::default();
    client.push_status(503);
    client.push_transport_error("connection reset");
    client.push_ok(forecast_body(&dry_day(10.0)));
    let sleeper = CountingSleeper::default();

    let result = assessor(&client, &sleeper)
        .assess(&[RoutePoint::new(51.5, -0.1)], fixed_now(), &window(), 0.5)
        .unwrap();

    assert!(!result.umbrella_required);
    assert_eq!(client.requested.borrow().len(), 3);
    assert_eq!(sleeper.sleeps.borrow().len(), 2);
}

#[test]
fn test_exhausted_first_point_fails_whole_route() {
    let client = ScriptedClient::default();
    for _ in 0..3 {
        client.push_status(500);
    }
    client.push_ok(forecast_body(&dry_day(10.0)));
    let sleeper = CountingSleeper::default();
    let route = [RoutePoint::new(51.5, -0.1), RoutePoint::new(51.45, -0.2)];

    let err = assessor(&client, &sleeper)
        .assess(&route, fixed_now(), &window(), 0.5)
        .unwrap_err();

    match err {
        AssessError::FetchExhausted { attempts, last_failure } => {
            assert_eq!(attempts, 3);
            assert!(last_failure.contains("HTTP 500"), "{}", last_failure);
        }
        other => panic!("expected FetchExhausted, got {:?}", other),
    }
    assert_eq!(client.requested.borrow().len(), 3, "second point never requested");
}

#[test]
fn test_malformed_body_is_reported() {
    let client = ScriptedClient::serving(vec!["<html>oops</html>".to_string()]);
    let sleeper = CountingSleeper::default();

    let err = assessor(&client, &sleeper)
        .assess(&[RoutePoint::new(51.5, -0.1)], fixed_now(), &window(), 0.5)
        .unwrap_err();

    assert!(matches!(err, AssessError::MalformedResponse(_)));
}
