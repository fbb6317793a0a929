//! Monitoring side of airwatch: sensor readers, the flat log files and the
//! polling loop that ties the sensor to alerting and telemetry.

pub mod error_log;
pub mod monitor;
pub mod readings_log;
pub mod sensor;

pub use monitor::{Monitor, Phase, TickOutcome};
pub use sensor::{CommandSensor, Poll, SensorError, SensorReader, SimulatedSensor};
