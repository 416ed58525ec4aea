#![deny(missing_docs)]

//! Core library for the Drill Bot status indicator service.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Recurring random status simulation.
pub mod driver;
/// Blinking status indicators and their output backends.
pub mod indicator;
/// Structured logging and tracing setup.
pub mod logging;
/// Indicator activity counters.
pub mod metrics;
/// Process-wide set of the three status indicators.
pub mod registry;
