//! Push notification of the umbrella decision.
//!
//! Messages are delivered through Pushover. Delivery is synchronous: `send`
//! returns once Pushover has accepted or rejected the message.
//!
//! API Documentation: https://pushover.net/api

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::logging;
use crate::logging::Component;
use crate::model::{AssessError, AssessmentResult};

pub const PUSHOVER_BASE_URL: &str = "https://api.pushover.net";

const REQUEST_TIMEOUT_SECS: u64 = 10;

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Pushover message priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    Low,
    Normal,
    High,
}

impl Priority {
    fn as_pushover(&self) -> &'static str {
        match self {
            Priority::Low => "-1",
            Priority::Normal => "0",
            Priority::High => "1",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub message: String,
    pub priority: Priority,
    pub url: Option<String>,
}

/// The daily summary, e.g. `You need to take your umbrella (Low: 8°C, High: 15°C)`.
pub fn summary_notification(result: &AssessmentResult, forecast_url: Option<String>) -> Notification {
    let summary = if result.umbrella_required {
        "You need to take your umbrella"
    } else {
        "You don't need your umbrella!"
    };
    Notification {
        message: format!(
            "{} (Low: {}°C, High: {}°C)",
            summary,
            whole_degrees(result.low_temperature),
            whole_degrees(result.high_temperature)
        ),
        priority: Priority::Normal,
        url: forecast_url,
    }
}

fn whole_degrees(temperature: f64) -> f64 {
    // halves go to the even neighbour; adding 0.0 turns -0 into 0
    temperature.round_ties_even() + 0.0
}

/// The message sent instead of a summary when the assessment fails.
pub fn failure_notification(err: &AssessError) -> Notification {
    if err.is_nothing_to_report() {
        return Notification {
            message: "Nothing to report: no forecast hours left in today's working day".into(),
            priority: Priority::Low,
            url: None,
        };
    }
    Notification {
        message: format!("Umbrella check failed: {}", err),
        priority: Priority::High,
        url: None,
    }
}

// ---------------------------------------------------------------------------
// Channels
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Pushover rejected the message (HTTP {status}): {errors}")]
    Rejected { status: u16, errors: String },
}

/// Delivers a notification, reporting success or failure synchronously.
pub trait NotificationChannel {
    fn send(&self, notification: &Notification) -> Result<(), NotifyError>;
}

impl<N: NotificationChannel + ?Sized> NotificationChannel for &N {
    fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        (**self).send(notification)
    }
}

#[derive(Debug, Deserialize)]
struct PushoverReply {
    status: i64,
    #[serde(default)]
    request: Option<String>,
    #[serde(default)]
    errors: Vec<String>,
}

/// Sends notifications through the Pushover messages API.
#[derive(Debug, Clone)]
pub struct PushoverChannel {
    http: reqwest::blocking::Client,
    base_url: String,
    app_token: String,
    user_key: String,
}

impl PushoverChannel {
    pub fn new(app_token: &str, user_key: &str, base_url: &str) -> Result<Self, NotifyError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            app_token: app_token.to_string(),
            user_key: user_key.to_string(),
        })
    }
}

impl NotificationChannel for PushoverChannel {
    fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let mut form = vec![
            ("token", self.app_token.as_str()),
            ("user", self.user_key.as_str()),
            ("message", notification.message.as_str()),
            ("priority", notification.priority.as_pushover()),
        ];
        if let Some(url) = &notification.url {
            form.push(("url", url.as_str()));
        }

        let response = self
            .http
            .post(format!("{}/1/messages.json", self.base_url))
            .form(&form)
            .send()?;

        let status = response.status().as_u16();
        let reply: PushoverReply = response.json()?;
        if reply.status != 1 {
            return Err(NotifyError::Rejected {
                status,
                errors: reply.errors.join("; "),
            });
        }

        logging::info(
            Component::Notify,
            None,
            &format!(
                "Published message {}",
                reply.request.as_deref().unwrap_or("(no request id)")
            ),
        );
        Ok(())
    }
}

/// Logs notifications instead of delivering them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogChannel;

impl NotificationChannel for LogChannel {
    fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        logging::info(
            Component::Notify,
            None,
            &format!(
                "[dry run] {:?} priority: {} {}",
                notification.priority,
                notification.message,
                notification.url.as_deref().unwrap_or("")
            ),
        );
        Ok(())
    }
}
