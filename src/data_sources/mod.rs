//! External services consumed by the dashboard.
//!
//! # Data Sources
//!
//! - [`prediction`]: case forecasts, overload risk and recommendations
//!
//! Results are passed through for display. They never feed the threshold
//! alert rules in [`crate::metrics`].

pub mod prediction;

pub use prediction::PredictionClient;
