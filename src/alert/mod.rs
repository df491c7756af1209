//! Turning an assessment into something the commuter sees.
//!
//! Submodules:
//! - `thresholds` - which samples trigger an umbrella recommendation.
//! - `notify` - message wording and push delivery.

pub mod notify;
pub mod thresholds;
