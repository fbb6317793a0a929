//! Shared fakes for monitoring loop tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use airwatch_agent::readings_log::ReadingsLog;
use airwatch_agent::{Monitor, Poll, SensorError, SensorReader};
use airwatch_core::reading::Reading;
use airwatch_events::{DeliveryOutcome, NotificationChannel, NotifyError, RetryPolicy, TelemetrySink};
use airwatch_store::SettingsStore;

pub const SETTINGS: &str = "\
[General]
location_name = Lab
poll_interval = 5
temp_high_threshold = 85.0
temp_low_threshold = 50.0
co2_threshold = 1000.0
alert_repeat_count = 3
slack_api_token = xoxb-test
slack_channel = #alerts
adafruit_io_username = ops
adafruit_io_key = aio-test
adafruit_io_group = lab
adafruit_io_temp_feed = temperature
adafruit_io_humidity_feed = humidity
adafruit_io_co2_feed = co2
";

// ---------------------------------------------------------------------------
// Sensor
// ---------------------------------------------------------------------------

/// One scripted sensor response.
#[derive(Debug, Clone, Copy)]
pub enum Step {
    Sample(Reading),
    NoData,
    Fail,
    /// Respond with a sample after a delay.
    Slow(Duration, Reading),
    /// Never respond.
    Hang,
}

/// Reading at `fahrenheit` with normal humidity and CO2.
pub fn at_fahrenheit(fahrenheit: f64) -> Step {
    Step::Sample(Reading::from_fahrenheit(fahrenheit, 40.0, 600.0))
}

/// Sensor that replays a script, then reports no data.
#[derive(Clone, Default)]
pub struct ScriptedSensor {
    steps: Arc<Mutex<VecDeque<Step>>>,
    polls: Arc<AtomicU32>,
}

impl ScriptedSensor {
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Self {
        Self {
            steps: Arc::new(Mutex::new(steps.into_iter().collect())),
            polls: Arc::default(),
        }
    }

    pub fn polls(&self) -> u32 {
        self.polls.load(Ordering::SeqCst)
    }
}

impl SensorReader for ScriptedSensor {
    async fn poll(&mut self) -> Result<Poll, SensorError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        let step = self.steps.lock().unwrap().pop_front().unwrap_or(Step::NoData);
        match step {
            Step::Sample(reading) => Ok(Poll::Sample(reading)),
            Step::NoData => Ok(Poll::NoData),
            Step::Fail => Err(SensorError::Malformed("checksum mismatch".into())),
            Step::Slow(delay, reading) => {
                tokio::time::sleep(delay).await;
                Ok(Poll::Sample(reading))
            }
            Step::Hang => {
                std::future::pending::<()>().await;
                Ok(Poll::NoData)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Delivery
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct RecordingNotifier {
    messages: Arc<Mutex<Vec<String>>>,
    failing: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl NotificationChannel for RecordingNotifier {
    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        self.messages.lock().unwrap().push(text.to_string());
        if self.failing {
            return Err(NotifyError("channel_not_found".into()));
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct RecordingSink {
    calls: Arc<Mutex<Vec<(String, f64)>>>,
    outcome: DeliveryOutcome,
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self::answering(DeliveryOutcome::Delivered)
    }
}

impl RecordingSink {
    pub fn answering(outcome: DeliveryOutcome) -> Self {
        Self {
            calls: Arc::default(),
            outcome,
        }
    }

    pub fn calls(&self) -> Vec<(String, f64)> {
        self.calls.lock().unwrap().clone()
    }
}

impl TelemetrySink for RecordingSink {
    async fn publish(&self, feed_key: &str, value: f64) -> DeliveryOutcome {
        self.calls.lock().unwrap().push((feed_key.to_string(), value));
        self.outcome.clone()
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub dir: tempfile::TempDir,
    pub store: SettingsStore,
    pub sensor: ScriptedSensor,
    pub notifier: RecordingNotifier,
    pub sink: RecordingSink,
}

impl Harness {
    pub async fn new(steps: impl IntoIterator<Item = Step>) -> Self {
        Self::with_delivery(steps, RecordingNotifier::default(), RecordingSink::default()).await
    }

    pub async fn with_delivery(
        steps: impl IntoIterator<Item = Step>,
        notifier: RecordingNotifier,
        sink: RecordingSink,
    ) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("SingleSensorSettings.conf");
        std::fs::write(&path, SETTINGS).unwrap();
        let store = SettingsStore::open(path).await.unwrap();

        Self {
            dir,
            store,
            sensor: ScriptedSensor::new(steps),
            notifier,
            sink,
        }
    }

    pub fn readings_log_path(&self) -> std::path::PathBuf {
        self.dir.path().join("sensor_readings.log")
    }

    pub fn readings_logged(&self) -> Vec<String> {
        std::fs::read_to_string(self.readings_log_path())
            .map(|text| text.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub fn monitor(&self) -> Monitor<ScriptedSensor, RecordingNotifier, RecordingSink> {
        Monitor::new(
            self.store.clone(),
            self.sensor.clone(),
            self.notifier.clone(),
            self.sink.clone(),
            ReadingsLog::new(self.readings_log_path()),
        )
        .with_retry_policy(RetryPolicy {
            delay: Duration::ZERO,
            ..RetryPolicy::default()
        })
    }
}
