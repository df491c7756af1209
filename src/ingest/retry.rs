//! Fixed-gap retry loop for forecast requests.
//!
//! A request is retried on any non-success response or transport error.
//! The gap between attempts is constant; there is no backoff. The loop
//! blocks the calling thread while it waits.

use std::fmt::Display;
use std::thread;
use std::time::Duration;

use crate::logging;
use crate::logging::Component;
use crate::model::AssessError;

/// Default number of attempts per request.
pub const DEFAULT_ATTEMPTS: u32 = 3;

/// Default gap between attempts, in seconds.
pub const DEFAULT_GAP_SECS: f64 = 60.0;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// How many times to issue a request and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub gap: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
            gap: Duration::from_secs_f64(DEFAULT_GAP_SECS),
        }
    }
}

// ---------------------------------------------------------------------------
// Seams
// ---------------------------------------------------------------------------

/// A response that knows whether it succeeded.
pub trait StatusResponse {
    fn is_success(&self) -> bool;

    /// Short description for logs and the exhaustion error.
    fn describe(&self) -> String;
}

/// Waits between attempts.
pub trait Sleeper {
    fn sleep(&self, gap: Duration);
}

impl<S: Sleeper + ?Sized> Sleeper for &S {
    fn sleep(&self, gap: Duration) {
        (**self).sleep(gap);
    }
}

/// Blocks the current thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, gap: Duration) {
        thread::sleep(gap);
    }
}

// ---------------------------------------------------------------------------
// Fetcher
// ---------------------------------------------------------------------------

/// Issues a request until it succeeds or the policy's attempts run out.
#[derive(Debug, Clone)]
pub struct RetryingFetcher<S = ThreadSleeper> {
    policy: RetryPolicy,
    sleeper: S,
}

impl RetryingFetcher<ThreadSleeper> {
    pub fn new(policy: RetryPolicy) -> Self {
        Self::with_sleeper(policy, ThreadSleeper)
    }
}

impl<S: Sleeper> RetryingFetcher<S> {
    pub fn with_sleeper(policy: RetryPolicy, sleeper: S) -> Self {
        Self { policy, sleeper }
    }

    /// Calls `action` until it returns a successful response.
    ///
    /// `action` must be idempotent. A policy of zero attempts still makes
    /// one. After the last failed attempt this returns
    /// [`AssessError::FetchExhausted`] describing that attempt, without
    /// sleeping again.
    pub fn fetch<R, E, F>(&self, mut action: F) -> Result<R, AssessError>
    where
        R: StatusResponse,
        E: Display,
        F: FnMut() -> Result<R, E>,
    {
        let attempts = self.policy.attempts.max(1);
        let mut last_failure = String::new();

        for attempt in 1..=attempts {
            match action() {
                Ok(response) if response.is_success() => {
                    logging::debug(
                        Component::Forecast,
                        None,
                        &format!("Successfully retrieved {}", response.describe()),
                    );
                    return Ok(response);
                }
                Ok(response) => last_failure = response.describe(),
                Err(e) => last_failure = e.to_string(),
            }

            if attempt < attempts {
                logging::warn(
                    Component::Forecast,
                    None,
                    &format!(
                        "Attempt {} of {} failed ({}); retrying in {:?}",
                        attempt, attempts, last_failure, self.policy.gap
                    ),
                );
                self.sleeper.sleep(self.policy.gap);
            }
        }

        logging::error(
            Component::Forecast,
            None,
            &format!("Failed after {} attempts: {}", attempts, last_failure),
        );
        Err(AssessError::FetchExhausted { attempts, last_failure })
    }
}
