//! Umbrella necessity scoring.
//!
//! The score saturates: a faint signal scores near 0 and the score
//! approaches, but never reaches, 1 as probability or intensity grows.
//! Probability is weighted by 10 so a near-certain drizzle scores about the
//! same as a less certain but heavier downpour.

/// Scores one forecast hour from its precipitation probability (`[0, 1]`)
/// and intensity (mm/h, `>= 0`).
///
/// Returns exactly `0.0` when both inputs are zero, otherwise
/// `1 - 1 / (probability * 10 + intensity)`.
///
/// Inputs are not clamped. Callers must uphold the probability and intensity
/// domains; a denominator in `(0, 1)` yields a negative score.
pub fn umbrella_score(probability: f64, intensity: f64) -> f64 {
    if probability == 0.0 && intensity == 0.0 {
        return 0.0;
    }
    1.0 - 1.0 / (probability * 10.0 + intensity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_precipitation_scores_exactly_zero() {
        assert_eq!(umbrella_score(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_likely_rain_scores_high() {
        let score = umbrella_score(0.9, 2.0);
        assert!((score - (1.0 - 1.0 / 11.0)).abs() < 1e-12, "got {}", score);
    }

    #[test]
    fn test_probability_and_intensity_orderings_agree() {
        // intensity + probability * 10 and probability * 10 + intensity
        // are the same denominator.
        for &(p, i) in &[(0.3, 1.5), (1.0, 0.0), (0.15, 12.0)] {
            assert_eq!(umbrella_score(p, i), 1.0 - 1.0 / (i + p * 10.0));
        }
    }

    #[test]
    fn test_score_stays_below_one() {
        for &(p, i) in &[(1.0, 0.0), (1.0, 50.0), (0.5, 200.0), (1.0, 1e6)] {
            let score = umbrella_score(p, i);
            assert!(score < 1.0, "score {} for ({}, {}) reached 1", score, p, i);
        }
    }

    #[test]
    fn test_score_in_unit_interval_when_denominator_at_least_one() {
        let mut p = 0.1;
        while p <= 1.0 {
            let mut i = 0.0;
            while i <= 20.0 {
                let score = umbrella_score(p, i);
                assert!((0.0..1.0).contains(&score), "score {} for ({}, {})", score, p, i);
                i += 0.5;
            }
            p += 0.1;
        }
    }

    #[test]
    fn test_score_is_monotonic_in_probability() {
        let mut previous = umbrella_score(0.1, 1.0);
        for step in 2..=10 {
            let score = umbrella_score(step as f64 / 10.0, 1.0);
            assert!(score >= previous, "score dropped at probability {}", step);
            previous = score;
        }
    }

    #[test]
    fn test_score_is_monotonic_in_intensity() {
        let mut previous = umbrella_score(0.5, 0.0);
        for step in 1..=40 {
            let score = umbrella_score(0.5, step as f64 * 0.25);
            assert!(score >= previous, "score dropped at intensity step {}", step);
            previous = score;
        }
    }
}
