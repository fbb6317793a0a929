//! Adafruit IO telemetry sink.
//!
//! [`AdafruitIoSink`] creates one data point per publish through the REST
//! API v2 (`POST {base}/{username}/feeds/{feed_key}/data`). Feed keys use
//! the `{group}.{feed}` form. Path segments are percent-encoded.

use reqwest::Url;
use serde::Serialize;

use super::{DeliveryOutcome, TelemetrySink, REQUEST_TIMEOUT};

/// Default Adafruit IO REST API base URL.
pub const DEFAULT_ADAFRUIT_IO_URL: &str = "https://io.adafruit.com/api/v2";

/// Header carrying the Adafruit IO key.
const AIO_KEY_HEADER: &str = "X-AIO-Key";

#[derive(Debug, thiserror::Error)]
pub enum AdafruitError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Invalid Adafruit IO base URL: {0}")]
    BaseUrl(String),
}

#[derive(Debug, Serialize)]
struct DataPoint {
    value: f64,
}

/// Classify an HTTP status from the sink.
///
/// Timeouts, throttling and server errors are transient; any other failure
/// status means the request itself is wrong.
pub fn classify_status(status: reqwest::StatusCode) -> DeliveryOutcome {
    if status.is_success() {
        DeliveryOutcome::Delivered
    } else if status.is_server_error()
        || status == reqwest::StatusCode::REQUEST_TIMEOUT
        || status == reqwest::StatusCode::TOO_MANY_REQUESTS
    {
        DeliveryOutcome::RetryableFailure(format!("HTTP {}", status.as_u16()))
    } else {
        DeliveryOutcome::TerminalFailure(format!("HTTP {}", status.as_u16()))
    }
}

/// Publishes feed values for one Adafruit IO account.
pub struct AdafruitIoSink {
    client: reqwest::Client,
    base_url: Url,
    username: String,
    key: String,
}

impl AdafruitIoSink {
    /// `base_url` is normally [`DEFAULT_ADAFRUIT_IO_URL`].
    pub fn new(
        base_url: impl AsRef<str>,
        username: impl Into<String>,
        key: impl Into<String>,
    ) -> Result<Self, AdafruitError> {
        let base_url = base_url.as_ref();
        let base_url =
            Url::parse(base_url).map_err(|e| AdafruitError::BaseUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(AdafruitError::BaseUrl(base_url.to_string()));
        }
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url,
            username: username.into(),
            key: key.into(),
        })
    }

    fn data_url(&self, feed_key: &str) -> Option<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .ok()?
            .pop_if_empty()
            .extend([self.username.as_str(), "feeds", feed_key, "data"]);
        Some(url)
    }
}

impl TelemetrySink for AdafruitIoSink {
    async fn publish(&self, feed_key: &str, value: f64) -> DeliveryOutcome {
        let Some(url) = self.data_url(feed_key) else {
            return DeliveryOutcome::TerminalFailure(format!("no data URL for feed {feed_key}"));
        };
        let result = self
            .client
            .post(url)
            .header(AIO_KEY_HEADER, &self.key)
            .json(&DataPoint { value })
            .send()
            .await;

        match result {
            Ok(response) => classify_status(response.status()),
            // Connection, DNS and timeout errors are all transient.
            Err(e) if e.is_builder() => DeliveryOutcome::TerminalFailure(e.to_string()),
            Err(e) => DeliveryOutcome::RetryableFailure(e.to_string()),
        }
    }
}
