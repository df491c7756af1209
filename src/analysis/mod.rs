//! Forecast analysis for the umbrella decision.
//!
//! Submodules:
//! - `score` - per-hour umbrella necessity score.
//! - `window` - which forecast hours fall in the rest of today's work day.
//! - `assess` - runs the whole route and aggregates one decision.

pub mod assess;
pub mod score;
pub mod window;
