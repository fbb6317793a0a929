//! Telemetry points derived from a reading.
//!
//! Feed keys follow the `{group}.{feed}` naming of the telemetry sink.

use crate::reading::Reading;
use crate::settings::Settings;

/// One value to publish to the telemetry sink.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryPoint {
    pub feed_key: String,
    pub value: f64,
}

/// Build a feed key from a group and feed name.
pub fn feed_key(group: &str, feed: &str) -> String {
    format!("{group}.{feed}")
}

/// The three points published after every successful poll: temperature in
/// Fahrenheit, relative humidity and CO2.
pub fn telemetry_points(reading: &Reading, settings: &Settings) -> Vec<TelemetryPoint> {
    let io = &settings.adafruit;
    vec![
        TelemetryPoint {
            feed_key: feed_key(&io.group, &io.temp_feed),
            value: reading.temperature_fahrenheit(),
        },
        TelemetryPoint {
            feed_key: feed_key(&io.group, &io.humidity_feed),
            value: reading.relative_humidity,
        },
        TelemetryPoint {
            feed_key: feed_key(&io.group, &io.co2_feed),
            value: reading.co2_ppm,
        },
    ]
}
