//! Walkability scoring and report intake for crowdsourced sidewalk reports.
//!
//! The [`workflows::reports`] module owns the scoring rubric, intake validation, AI-draft
//! reconciliation, and the report service. [`workflows::geocoding`] provides the injectable
//! cache and rate limiter used in front of an external geocoder.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
