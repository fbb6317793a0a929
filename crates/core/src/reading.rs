//! Sensor reading snapshot and unit conversion.

use chrono::Utc;
use serde::Serialize;

use crate::types::Timestamp;

/// Convert degrees Celsius to degrees Fahrenheit.
pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}

/// One successful sensor sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Reading {
    pub temperature_celsius: f64,
    /// Relative humidity in percent.
    pub relative_humidity: f64,
    pub co2_ppm: f64,
    pub timestamp: Timestamp,
}

impl Reading {
    /// Create a reading stamped with the current time.
    pub fn new(temperature_celsius: f64, relative_humidity: f64, co2_ppm: f64) -> Self {
        Self::at(temperature_celsius, relative_humidity, co2_ppm, Utc::now())
    }

    pub fn at(
        temperature_celsius: f64,
        relative_humidity: f64,
        co2_ppm: f64,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            temperature_celsius,
            relative_humidity,
            co2_ppm,
            timestamp,
        }
    }

    /// Build a reading from a Fahrenheit temperature.
    pub fn from_fahrenheit(temperature_fahrenheit: f64, relative_humidity: f64, co2_ppm: f64) -> Self {
        Self::new(
            (temperature_fahrenheit - 32.0) * 5.0 / 9.0,
            relative_humidity,
            co2_ppm,
        )
    }

    pub fn temperature_fahrenheit(&self) -> f64 {
        celsius_to_fahrenheit(self.temperature_celsius)
    }

    /// `false` if any measured value is NaN or infinite.
    pub fn is_finite(&self) -> bool {
        self.temperature_celsius.is_finite()
            && self.relative_humidity.is_finite()
            && self.co2_ppm.is_finite()
    }
}
