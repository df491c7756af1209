//! Forecast retrieval.
//!
//! Submodules:
//! - `darksky` - the HTTP forecast client and the hourly record parser.
//! - `retry` - the fixed-gap retry loop wrapped around each request.

pub mod darksky;
pub mod retry;
