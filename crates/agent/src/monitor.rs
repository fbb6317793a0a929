//! The monitoring loop.
//!
//! A [`Monitor`] owns the sensor, the alert state and both delivery
//! clients. Each tick re-reads the settings snapshot, polls the sensor,
//! logs the reading, runs the alert state machine, sends any
//! notifications and publishes telemetry. [`Monitor::run`] drives ticks on
//! the configured poll interval until its [`CancellationToken`] fires.
//!
//! Failures inside a tick are logged and never end the loop: a sensor
//! error reschedules the next tick after a short backoff, and delivery
//! failures are counted in the [`TickOutcome`].

use std::time::Duration;

use airwatch_core::alerting::AlertStateMachine;
use airwatch_core::reading::Reading;
use airwatch_core::settings::Settings;
use airwatch_core::telemetry::telemetry_points;
use airwatch_events::{publish_with_retry, NotificationChannel, RetryPolicy, TelemetrySink};
use airwatch_store::SettingsStore;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::readings_log::ReadingsLog;
use crate::sensor::{Poll, SensorError, SensorReader};

/// Upper bound on a single sensor poll.
pub const SENSOR_TIMEOUT: Duration = Duration::from_secs(30);

/// Delay before the next tick after a failed one.
pub const ERROR_BACKOFF: Duration = Duration::from_secs(10);

/// Where the loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Initializing,
    Polling,
    Idle,
    ShuttingDown,
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The sensor had no new data; nothing was logged or delivered.
    Skipped,
    Completed {
        notifications_sent: usize,
        notifications_failed: usize,
        telemetry_published: usize,
        telemetry_failed: usize,
    },
}

pub struct Monitor<S, N, T> {
    store: SettingsStore,
    sensor: S,
    notifier: N,
    sink: T,
    readings_log: ReadingsLog,
    alerts: AlertStateMachine,
    retry: RetryPolicy,
    sensor_timeout: Duration,
    error_backoff: Duration,
    phase: Phase,
}

impl<S, N, T> Monitor<S, N, T>
where
    S: SensorReader,
    N: NotificationChannel,
    T: TelemetrySink,
{
    pub fn new(
        store: SettingsStore,
        sensor: S,
        notifier: N,
        sink: T,
        readings_log: ReadingsLog,
    ) -> Self {
        Self {
            store,
            sensor,
            notifier,
            sink,
            readings_log,
            alerts: AlertStateMachine::new(),
            retry: RetryPolicy::default(),
            sensor_timeout: SENSOR_TIMEOUT,
            error_backoff: ERROR_BACKOFF,
            phase: Phase::Initializing,
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_sensor_timeout(mut self, timeout: Duration) -> Self {
        self.sensor_timeout = timeout;
        self
    }

    pub fn with_error_backoff(mut self, backoff: Duration) -> Self {
        self.error_backoff = backoff;
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn alerts(&self) -> &AlertStateMachine {
        &self.alerts
    }

    /// Run one poll cycle against the current settings snapshot.
    pub async fn tick(&mut self) -> Result<TickOutcome, SensorError> {
        self.phase = Phase::Polling;
        let settings = self.store.snapshot().await;
        let span = tracing::info_span!("tick", location = %settings.location_name);
        let result = self.tick_with(&settings).instrument(span).await;
        self.phase = Phase::Idle;
        result
    }

    async fn tick_with(&mut self, settings: &Settings) -> Result<TickOutcome, SensorError> {
        let reading = match self.poll_sensor().await? {
            Poll::Sample(reading) => reading,
            Poll::NoData => {
                tracing::debug!("No new sensor data, skipping tick");
                return Ok(TickOutcome::Skipped);
            }
        };

        tracing::info!(
            temperature_f = reading.temperature_fahrenheit(),
            humidity = reading.relative_humidity,
            co2_ppm = reading.co2_ppm,
            "Sensor reading",
        );

        if let Err(e) = self.readings_log.append(&settings.location_name, &reading).await {
            tracing::error!(
                path = %self.readings_log.path().display(),
                error = %e,
                "Failed to append to readings log",
            );
        }

        let (notifications_sent, notifications_failed) = self.notify(&reading, settings).await;
        let (telemetry_published, telemetry_failed) = self.publish(&reading, settings).await;

        Ok(TickOutcome::Completed {
            notifications_sent,
            notifications_failed,
            telemetry_published,
            telemetry_failed,
        })
    }

    async fn poll_sensor(&mut self) -> Result<Poll, SensorError> {
        let poll = match tokio::time::timeout(self.sensor_timeout, self.sensor.poll()).await {
            Ok(result) => result?,
            Err(_) => return Err(SensorError::Timeout(self.sensor_timeout)),
        };
        match poll {
            Poll::Sample(reading) if !reading.is_finite() => Err(SensorError::NonFinite),
            other => Ok(other),
        }
    }

    async fn notify(&mut self, reading: &Reading, settings: &Settings) -> (usize, usize) {
        let mut sent = 0;
        let mut failed = 0;

        for notification in self.alerts.evaluate(reading, settings) {
            match self.notifier.send(&notification.message).await {
                Ok(()) => {
                    sent += 1;
                    tracing::info!(
                        quantity = %notification.quantity,
                        transition = ?notification.transition,
                        "Notification sent",
                    );
                }
                Err(e) => {
                    failed += 1;
                    tracing::error!(
                        quantity = %notification.quantity,
                        error = %e,
                        "Failed to send notification",
                    );
                }
            }
        }
        (sent, failed)
    }

    async fn publish(&self, reading: &Reading, settings: &Settings) -> (usize, usize) {
        let mut published = 0;
        let mut failed = 0;

        for point in telemetry_points(reading, settings) {
            match publish_with_retry(&self.sink, &point.feed_key, point.value, &self.retry).await {
                Ok(_) => published += 1,
                Err(e) => {
                    failed += 1;
                    tracing::error!(feed_key = %point.feed_key, error = %e, "Telemetry publish failed");
                }
            }
        }
        (published, failed)
    }

    /// Drive ticks until `cancel` fires.
    ///
    /// The first tick runs immediately. Each following tick is scheduled
    /// one poll interval after the previous tick's start, whether it
    /// produced data or not; a failed tick is retried after the error
    /// backoff instead. An in-flight tick always runs to completion.
    pub async fn run(&mut self, cancel: CancellationToken) {
        tracing::info!("Monitoring loop started");
        let mut next_tick = Instant::now();

        loop {
            self.phase = Phase::Idle;
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep_until(next_tick) => {}
            }

            let started = Instant::now();
            match self.tick().await {
                Ok(_) => {
                    let interval = self.store.snapshot().await.poll_interval();
                    next_tick = (started + interval).max(Instant::now());
                }
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        backoff_secs = self.error_backoff.as_secs(),
                        "Sensor poll failed",
                    );
                    next_tick = Instant::now() + self.error_backoff;
                }
            }
        }

        self.phase = Phase::ShuttingDown;
        tracing::info!("Monitoring loop stopped");
    }
}

