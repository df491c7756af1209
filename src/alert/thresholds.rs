//! Umbrella score threshold checks.
//!
//! A sample "triggers" when its umbrella score meets or exceeds the
//! configured threshold; one triggering hour anywhere on the route is enough
//! to recommend an umbrella.

use crate::model::HourlySample;

/// Returns `true` if the sample's score is at or above `threshold`.
pub fn meets_threshold(sample: &HourlySample, threshold: f64) -> bool {
    sample.umbrella_score() >= threshold
}

/// The triggering samples, in their original order.
pub fn samples_over_threshold(samples: &[HourlySample], threshold: f64) -> Vec<HourlySample> {
    samples
        .iter()
        .filter(|sample| meets_threshold(sample, threshold))
        .cloned()
        .collect()
}
