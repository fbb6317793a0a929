//! External delivery channels for alerts and telemetry.
//!
//! The monitoring loop depends only on the two contracts defined here:
//! [`NotificationChannel`] for human-readable alert text and
//! [`TelemetrySink`] for numeric feed values. [`publish_with_retry`] owns
//! the retry policy around telemetry publishing.

pub mod adafruit;
pub mod slack;

use std::fmt;
use std::future::Future;
use std::time::Duration;

/// Number of publish attempts before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Fixed delay between publish attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// HTTP request timeout for a single delivery attempt.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Contracts
// ---------------------------------------------------------------------------

/// Error returned when a notification could not be delivered.
#[derive(Debug, thiserror::Error)]
#[error("Notification delivery failed: {0}")]
pub struct NotifyError(pub String);

/// A channel that delivers human-readable alert text.
pub trait NotificationChannel: Send + Sync {
    fn send(&self, text: &str) -> impl Future<Output = Result<(), NotifyError>> + Send;
}

/// Result of a single attempt to reach the telemetry sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    /// Transient failure (network, timeout, throttling, server error).
    RetryableFailure(String),
    /// The sink rejected the request; retrying will not help.
    TerminalFailure(String),
}

impl fmt::Display for DeliveryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryOutcome::Delivered => f.write_str("delivered"),
            DeliveryOutcome::RetryableFailure(reason) => write!(f, "retryable failure: {reason}"),
            DeliveryOutcome::TerminalFailure(reason) => write!(f, "terminal failure: {reason}"),
        }
    }
}

/// A time-series store that accepts one value per feed key.
///
/// Publishing the same `(feed_key, value)` twice must be harmless since
/// retries do not deduplicate.
pub trait TelemetrySink: Send + Sync {
    fn publish(&self, feed_key: &str, value: f64)
        -> impl Future<Output = DeliveryOutcome> + Send;
}

// ---------------------------------------------------------------------------
// Retry
// ---------------------------------------------------------------------------

/// Fixed-delay retry bound for telemetry publishing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay between consecutive attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// Error returned by [`publish_with_retry`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TelemetryError {
    /// Every attempt failed with a retryable error.
    #[error("Publishing to {feed_key} failed after {attempts} attempts: {last_error}")]
    Exhausted {
        feed_key: String,
        attempts: u32,
        last_error: String,
    },

    /// The sink rejected the value outright.
    #[error("Publishing to {feed_key} rejected: {reason}")]
    Rejected { feed_key: String, reason: String },
}

/// Publish one value, retrying transient failures.
///
/// Makes at most `policy.max_attempts` calls with `policy.delay` between
/// them. A terminal failure returns immediately. Returns the number of
/// attempts used on success.
pub async fn publish_with_retry<S>(
    sink: &S,
    feed_key: &str,
    value: f64,
    policy: &RetryPolicy,
) -> Result<u32, TelemetryError>
where
    S: TelemetrySink,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut last_error = String::new();

    for attempt in 1..=max_attempts {
        match sink.publish(feed_key, value).await {
            DeliveryOutcome::Delivered => {
                if attempt > 1 {
                    tracing::info!(feed_key, attempt, "Telemetry published after retry");
                }
                return Ok(attempt);
            }
            DeliveryOutcome::TerminalFailure(reason) => {
                return Err(TelemetryError::Rejected {
                    feed_key: feed_key.to_string(),
                    reason,
                });
            }
            DeliveryOutcome::RetryableFailure(reason) => {
                tracing::warn!(
                    feed_key,
                    attempt,
                    max_attempts,
                    error = %reason,
                    "Telemetry publish attempt failed"
                );
                last_error = reason;
                if attempt < max_attempts {
                    tokio::time::sleep(policy.delay).await;
                }
            }
        }
    }

    Err(TelemetryError::Exhausted {
        feed_key: feed_key.to_string(),
        attempts: max_attempts,
        last_error,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
