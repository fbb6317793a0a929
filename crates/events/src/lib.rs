//! Outbound delivery for the air-quality monitor.
//!
//! - [`delivery::NotificationChannel`] and [`SlackNotifier`] carry alert text.
//! - [`delivery::TelemetrySink`] and [`AdafruitIoSink`] carry feed values.
//! - [`publish_with_retry`] bounds telemetry retries.

pub mod delivery;

pub use delivery::adafruit::{AdafruitError, AdafruitIoSink};
pub use delivery::slack::SlackNotifier;
pub use delivery::{
    publish_with_retry, DeliveryOutcome, NotificationChannel, NotifyError, RetryPolicy,
    TelemetryError, TelemetrySink,
};
