//! Append-only flat log of successful readings.

use std::path::{Path, PathBuf};

use airwatch_core::reading::Reading;
use chrono::Local;
use tokio::io::AsyncWriteExt;

/// Local wall-clock timestamp format shared with the error log.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Render one log line (without the trailing newline).
pub fn format_line(location: &str, reading: &Reading) -> String {
    format!(
        "{} - {} - Temperature: {:.1}°F, Humidity: {:.1}%, CO2: {:.0} ppm",
        reading.timestamp.with_timezone(&Local).format(TIMESTAMP_FORMAT),
        location,
        reading.temperature_fahrenheit(),
        reading.relative_humidity,
        reading.co2_ppm,
    )
}

#[derive(Debug, Clone)]
pub struct ReadingsLog {
    path: PathBuf,
}

impl ReadingsLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one line, creating the file if needed.
    pub async fn append(&self, location: &str, reading: &Reading) -> std::io::Result<()> {
        let mut line = format_line(location, reading);
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await
    }
}
