//! Commute umbrella forecast service.
//!
//! Once per invocation, checks the hourly forecast along a commute route for
//! the rest of today's working day and decides whether an umbrella is
//! needed. The decision, with the day's apparent temperature range, is then
//! pushed to the commuter's phone.
//!
//! Modules:
//! - `model` - shared domain types and the assessment error taxonomy.
//! - `ingest` - forecast requests with retries, and sample parsing.
//! - `analysis` - scoring, work-window filtering and route assessment.
//! - `alert` - threshold selection and push notifications.
//! - `config` - TOML / environment configuration.
//! - `logging` - structured logging setup and helpers.

pub mod alert;
pub mod analysis;
pub mod config;
pub mod ingest;
pub mod logging;
pub mod model;

pub use analysis::assess::RouteAssessor;
pub use config::Config;
pub use model::{AssessError, AssessmentResult, HourlySample, RoutePoint, WorkWindow};
