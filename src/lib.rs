//! Wardwatch - hospital resource utilization and overload alerting.
//!
//! # Overview
//!
//! Hospitals report daily resource counts: beds, ICU beds, ventilators,
//! oxygen cylinders and clinical staff, each as an (available, total) pair.
//! Wardwatch validates those reports, derives occupancy and utilization
//! metrics from them and raises threshold alerts when capacity runs short.
//!
//! Forecasting and overload-risk scoring belong to an external prediction
//! service. Wardwatch displays its results next to the local metrics but
//! never mixes them into its own alert rules.
//!
//! # Modules
//!
//! - [`model`]: Resource records, derived metrics and alerts
//! - [`metrics`]: The pure metrics engine (parse, validate, derive, alert)
//! - [`error`]: Validation errors
//! - [`storage`]: SQLite storage layer
//! - [`aggregation`]: Latest snapshot and trend over stored records
//! - [`data_sources`]: Client for the external prediction service
//! - [`dashboard`]: Combined dashboard view
//! - [`api`]: HTTP API handlers

pub mod aggregation;
pub mod api;
pub mod dashboard;
pub mod data_sources;
pub mod error;
pub mod metrics;
pub mod model;
pub mod storage;
