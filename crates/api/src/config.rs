use std::path::PathBuf;

use airwatch_events::delivery::adafruit::DEFAULT_ADAFRUIT_IO_URL;
use airwatch_events::delivery::slack::DEFAULT_SLACK_API_URL;

/// Process configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} must be a valid {expected}, got {value:?}")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// How the sensor is reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SensorSource {
    /// Run this command line per poll.
    Command(String),
    /// Random-walk readings, no hardware.
    Simulated,
    /// Neither `SENSOR_COMMAND` nor `SENSOR_SIMULATED` was set.
    Unconfigured,
}

/// Process configuration loaded from environment variables.
///
/// Domain settings (thresholds, credentials, poll interval) live in the
/// settings file at `settings_path`, not here.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `5000`).
    pub port: u16,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    pub settings_path: PathBuf,
    pub readings_log_path: PathBuf,
    pub error_log_path: PathBuf,
    pub sensor: SensorSource,
    /// Command line run to reboot the host.
    pub reboot_command: String,
    pub slack_api_url: String,
    pub adafruit_io_url: String,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                          |
    /// |------------------------|----------------------------------|
    /// | `HOST`                 | `0.0.0.0`                        |
    /// | `PORT`                 | `5000`                           |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                             |
    /// | `SETTINGS_PATH`        | `SingleSensorSettings.conf`      |
    /// | `READINGS_LOG_PATH`    | `sensor_readings.log`            |
    /// | `ERROR_LOG_PATH`       | `error_log.log`                  |
    /// | `SENSOR_COMMAND`       | unset                            |
    /// | `SENSOR_SIMULATED`     | `0`                              |
    /// | `REBOOT_COMMAND`       | `sudo reboot`                    |
    /// | `SLACK_API_URL`        | `https://slack.com/api`          |
    /// | `ADAFRUIT_IO_URL`      | `https://io.adafruit.com/api/v2` |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        let port = parse_var("PORT", &var("PORT", "5000"), "u16")?;
        let request_timeout_secs =
            parse_var("REQUEST_TIMEOUT_SECS", &var("REQUEST_TIMEOUT_SECS", "30"), "u64")?;

        let simulated = matches!(
            var("SENSOR_SIMULATED", "0").trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes"
        );
        let sensor = match lookup("SENSOR_COMMAND").filter(|c| !c.trim().is_empty()) {
            Some(command) => SensorSource::Command(command),
            None if simulated => SensorSource::Simulated,
            None => SensorSource::Unconfigured,
        };

        Ok(Self {
            host: var("HOST", "0.0.0.0"),
            port,
            request_timeout_secs,
            settings_path: var("SETTINGS_PATH", "SingleSensorSettings.conf").into(),
            readings_log_path: var("READINGS_LOG_PATH", "sensor_readings.log").into(),
            error_log_path: var("ERROR_LOG_PATH", "error_log.log").into(),
            sensor,
            reboot_command: var("REBOOT_COMMAND", "sudo reboot"),
            slack_api_url: var("SLACK_API_URL", DEFAULT_SLACK_API_URL),
            adafruit_io_url: var("ADAFRUIT_IO_URL", DEFAULT_ADAFRUIT_IO_URL),
        })
    }
}

fn parse_var<T: std::str::FromStr>(
    name: &'static str,
    value: &str,
    expected: &'static str,
) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        name,
        expected,
        value: value.to_string(),
    })
}
