//! Domain logic for the airwatch environmental monitor.
//!
//! Pure logic, no I/O: the settings schema and its text format, sensor
//! readings, the alert state machine, and telemetry point construction.

pub mod alerting;
pub mod error;
pub mod reading;
pub mod settings;
pub mod telemetry;
pub mod types;
