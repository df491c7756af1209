//! Work-window filtering of forecast hours.
//!
//! A forecast hour is relevant when, viewed in the window's timezone, it
//! falls on today's date, has not already started, and begins within the
//! configured working-day span.
//!
//! # Clock injection
//! All functions take `now` as a parameter rather than calling `Utc::now()`,
//! so one run uses one consistent "now" even if it strides midnight, and
//! tests stay deterministic.

use chrono::{DateTime, TimeZone, Utc};

use crate::model::WorkWindow;

impl WorkWindow {
    /// Returns `true` if `sample_time` is in the remainder of today's
    /// working day relative to `now`.
    ///
    /// Both window bounds are inclusive.
    pub fn contains<Z: TimeZone>(&self, sample_time: DateTime<Z>, now: DateTime<Z>) -> bool {
        let local = sample_time.with_timezone(&self.timezone);
        let local_now = now.with_timezone(&self.timezone);

        // only today's weather
        local.date_naive() == local_now.date_naive()
            // nothing earlier today
            && local >= local_now
            // only between the configured times
            && self.begin <= local.time()
            && local.time() <= self.end
    }
}

/// Free-function form of [`WorkWindow::contains`].
pub fn is_relevant(sample_time: DateTime<Utc>, now: DateTime<Utc>, window: &WorkWindow) -> bool {
    window.contains(sample_time, now)
}
