//! Sensor readers.
//!
//! The monitoring loop talks to hardware only through [`SensorReader`].
//! Two implementations ship here:
//!
//! - [`CommandSensor`] runs a helper program that talks to the sensor
//!   driver and prints one JSON sample on stdout.
//! - [`SimulatedSensor`] produces a bounded random walk for hosts without
//!   the hardware attached.

use std::future::Future;
use std::time::Duration;

use airwatch_core::reading::Reading;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use tokio::process::Command;

/// Default timeout for one helper program invocation.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Result of a successful poll.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Poll {
    Sample(Reading),
    /// The sensor has no new measurement yet.
    NoData,
}

#[derive(Debug, thiserror::Error)]
pub enum SensorError {
    #[error("Sensor I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Sensor poll timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Malformed sensor output: {0}")]
    Malformed(String),

    #[error("Sensor returned a non-finite value")]
    NonFinite,

    #[error("Sensor command exited with status {status}: {stderr}")]
    CommandFailed { status: i32, stderr: String },
}

/// Source of environmental readings.
pub trait SensorReader: Send {
    fn poll(&mut self) -> impl Future<Output = Result<Poll, SensorError>> + Send;
}

// ---------------------------------------------------------------------------
// CommandSensor
// ---------------------------------------------------------------------------

/// Output printed by the helper program.
#[derive(Debug, Deserialize)]
struct RawSample {
    /// Some drivers report readiness explicitly instead of printing nothing.
    #[serde(default)]
    data_ready: Option<bool>,
    temperature_celsius: Option<f64>,
    relative_humidity: Option<f64>,
    co2_ppm: Option<f64>,
}

/// Parse one line of helper program output.
///
/// Empty output or `"data_ready": false` means no new measurement.
pub fn parse_sample(stdout: &str) -> Result<Poll, SensorError> {
    let text = stdout.trim();
    if text.is_empty() {
        return Ok(Poll::NoData);
    }

    let raw: RawSample =
        serde_json::from_str(text).map_err(|e| SensorError::Malformed(e.to_string()))?;
    if raw.data_ready == Some(false) {
        return Ok(Poll::NoData);
    }

    let (Some(temperature), Some(humidity), Some(co2)) =
        (raw.temperature_celsius, raw.relative_humidity, raw.co2_ppm)
    else {
        return Err(SensorError::Malformed(
            "expected temperature_celsius, relative_humidity and co2_ppm".to_string(),
        ));
    };

    let reading = Reading::new(temperature, humidity, co2);
    if !reading.is_finite() {
        return Err(SensorError::NonFinite);
    }
    Ok(Poll::Sample(reading))
}

/// Runs an external program per poll and parses its stdout.
#[derive(Debug, Clone)]
pub struct CommandSensor {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandSensor {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    /// Split a whitespace-separated command line into program and args.
    ///
    /// Returns `None` for a blank command line.
    pub fn from_command_line(command_line: &str) -> Option<Self> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self::new(program, parts.collect()))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run the helper once to confirm the sensor is reachable.
    ///
    /// `NoData` counts as reachable.
    pub async fn connect(mut self) -> Result<Self, SensorError> {
        self.poll().await?;
        tracing::info!(program = %self.program, "Sensor command reachable");
        Ok(self)
    }

    async fn run_once(&self) -> Result<Poll, SensorError> {
        let result = tokio::time::timeout(
            self.timeout,
            Command::new(&self.program)
                .args(&self.args)
                .kill_on_drop(true)
                .output(),
        )
        .await;

        let output = match result {
            Ok(output) => output?,
            Err(_) => return Err(SensorError::Timeout(self.timeout)),
        };

        if !output.status.success() {
            return Err(SensorError::CommandFailed {
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        parse_sample(&String::from_utf8_lossy(&output.stdout))
    }
}

impl SensorReader for CommandSensor {
    async fn poll(&mut self) -> Result<Poll, SensorError> {
        self.run_once().await
    }
}

// ---------------------------------------------------------------------------
// SimulatedSensor
// ---------------------------------------------------------------------------

const TEMP_RANGE_C: (f64, f64) = (15.0, 35.0);
const HUMIDITY_RANGE: (f64, f64) = (20.0, 80.0);
const CO2_RANGE_PPM: (f64, f64) = (400.0, 2000.0);

/// Random-walk sensor for development hosts.
#[derive(Debug)]
pub struct SimulatedSensor {
    rng: StdRng,
    temperature_celsius: f64,
    relative_humidity: f64,
    co2_ppm: f64,
}

impl Default for SimulatedSensor {
    fn default() -> Self {
        Self::from_rng(StdRng::from_os_rng())
    }
}

impl SimulatedSensor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deterministic sequence for a given seed.
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            rng,
            temperature_celsius: 22.0,
            relative_humidity: 45.0,
            co2_ppm: 650.0,
        }
    }

    fn step(&mut self) -> Reading {
        self.temperature_celsius = walk(&mut self.rng, self.temperature_celsius, 0.3, TEMP_RANGE_C);
        self.relative_humidity = walk(&mut self.rng, self.relative_humidity, 1.0, HUMIDITY_RANGE);
        self.co2_ppm = walk(&mut self.rng, self.co2_ppm, 25.0, CO2_RANGE_PPM);
        Reading::new(self.temperature_celsius, self.relative_humidity, self.co2_ppm)
    }
}

fn walk(rng: &mut StdRng, value: f64, max_step: f64, (low, high): (f64, f64)) -> f64 {
    (value + rng.random_range(-max_step..=max_step)).clamp(low, high)
}

impl SensorReader for SimulatedSensor {
    async fn poll(&mut self) -> Result<Poll, SensorError> {
        Ok(Poll::Sample(self.step()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
