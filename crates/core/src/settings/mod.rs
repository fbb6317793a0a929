//! Runtime settings: the typed view of the settings record.
//!
//! [`Settings`] is what the monitoring loop consumes. It is always built from
//! a complete [`SettingsRecord`] so that type checks and semantic checks run
//! in one place, whether the record came from disk or from a control-surface
//! update.

pub mod codec;
pub mod schema;

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use crate::alerting::AlertPolicy;
use crate::error::CoreError;

pub use schema::{SettingValue, SettingsRecord, ValueKind, REDACTED_VALUE, SCHEMA};
use schema::*;

/// Which alert policy the settings select.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertPolicyKind {
    Edge,
    Count,
}

impl AlertPolicyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AlertPolicyKind::Edge => "edge",
            AlertPolicyKind::Count => "count",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "edge" => Some(AlertPolicyKind::Edge),
            "count" => Some(AlertPolicyKind::Count),
            _ => None,
        }
    }
}

/// Slack credentials and destination.
#[derive(Clone, PartialEq)]
pub struct SlackSettings {
    pub api_token: String,
    pub channel: String,
}

/// Adafruit IO credentials and feed names.
#[derive(Clone, PartialEq)]
pub struct AdafruitSettings {
    pub username: String,
    pub key: String,
    pub group: String,
    pub temp_feed: String,
    pub humidity_feed: String,
    pub co2_feed: String,
}

/// Fully validated settings snapshot.
#[derive(Clone, PartialEq)]
pub struct Settings {
    pub location_name: String,
    pub poll_interval_minutes: u32,
    /// Degrees Fahrenheit.
    pub temp_high_threshold: f64,
    /// Degrees Fahrenheit.
    pub temp_low_threshold: f64,
    /// Parts per million.
    pub co2_threshold: f64,
    pub alert_repeat_count: u32,
    pub alert_policy: AlertPolicyKind,
    pub slack: SlackSettings,
    pub adafruit: AdafruitSettings,
}

impl Settings {
    /// Parse and validate the text of a settings file.
    pub fn parse(text: &str) -> Result<Self, CoreError> {
        let raw = codec::parse(text)?;
        let record = SettingsRecord::from_raw(&raw)?;
        Self::from_record(&record)
    }

    /// Render the settings in the on-disk text format.
    pub fn render(&self) -> std::io::Result<String> {
        codec::render(&self.to_record())
    }

    /// Build the typed view from a complete record, applying semantic checks.
    pub fn from_record(record: &SettingsRecord) -> Result<Self, CoreError> {
        let location_name = text(record, KEY_LOCATION_NAME)?;
        if location_name.trim().is_empty() {
            return Err(invalid(KEY_LOCATION_NAME, "must not be empty"));
        }

        let poll_interval_minutes = positive_u32(record, KEY_POLL_INTERVAL)?;
        let alert_repeat_count = positive_u32(record, KEY_ALERT_REPEAT_COUNT)?;

        let policy_raw = text(record, KEY_ALERT_POLICY)?;
        let alert_policy = AlertPolicyKind::parse(&policy_raw)
            .ok_or_else(|| invalid(KEY_ALERT_POLICY, "must be \"edge\" or \"count\""))?;

        Ok(Self {
            location_name,
            poll_interval_minutes,
            temp_high_threshold: float(record, KEY_TEMP_HIGH_THRESHOLD)?,
            temp_low_threshold: float(record, KEY_TEMP_LOW_THRESHOLD)?,
            co2_threshold: float(record, KEY_CO2_THRESHOLD)?,
            alert_repeat_count,
            alert_policy,
            slack: SlackSettings {
                api_token: text(record, KEY_SLACK_API_TOKEN)?,
                channel: text(record, KEY_SLACK_CHANNEL)?,
            },
            adafruit: AdafruitSettings {
                username: text(record, KEY_ADAFRUIT_IO_USERNAME)?,
                key: text(record, KEY_ADAFRUIT_IO_KEY)?,
                group: text(record, KEY_ADAFRUIT_IO_GROUP)?,
                temp_feed: text(record, KEY_ADAFRUIT_IO_TEMP_FEED)?,
                humidity_feed: text(record, KEY_ADAFRUIT_IO_HUMIDITY_FEED)?,
                co2_feed: text(record, KEY_ADAFRUIT_IO_CO2_FEED)?,
            },
        })
    }

    /// Flatten back into the persisted record.
    pub fn to_record(&self) -> SettingsRecord {
        let mut record = SettingsRecord::empty();
        let t = |s: &str| SettingValue::Text(s.to_string());
        record.insert(KEY_LOCATION_NAME, t(&self.location_name));
        record.insert(
            KEY_POLL_INTERVAL,
            SettingValue::Integer(i64::from(self.poll_interval_minutes)),
        );
        record.insert(
            KEY_TEMP_HIGH_THRESHOLD,
            SettingValue::Float(self.temp_high_threshold),
        );
        record.insert(
            KEY_TEMP_LOW_THRESHOLD,
            SettingValue::Float(self.temp_low_threshold),
        );
        record.insert(KEY_CO2_THRESHOLD, SettingValue::Float(self.co2_threshold));
        record.insert(
            KEY_ALERT_REPEAT_COUNT,
            SettingValue::Integer(i64::from(self.alert_repeat_count)),
        );
        record.insert(KEY_ALERT_POLICY, t(self.alert_policy.as_str()));
        record.insert(KEY_SLACK_API_TOKEN, t(&self.slack.api_token));
        record.insert(KEY_SLACK_CHANNEL, t(&self.slack.channel));
        record.insert(KEY_ADAFRUIT_IO_USERNAME, t(&self.adafruit.username));
        record.insert(KEY_ADAFRUIT_IO_KEY, t(&self.adafruit.key));
        record.insert(KEY_ADAFRUIT_IO_GROUP, t(&self.adafruit.group));
        record.insert(KEY_ADAFRUIT_IO_TEMP_FEED, t(&self.adafruit.temp_feed));
        record.insert(
            KEY_ADAFRUIT_IO_HUMIDITY_FEED,
            t(&self.adafruit.humidity_feed),
        );
        record.insert(KEY_ADAFRUIT_IO_CO2_FEED, t(&self.adafruit.co2_feed));
        record
    }

    /// Merge string updates into a copy of these settings.
    ///
    /// Each value is coerced to the type the key already has. The first
    /// unknown key, unparseable value or failed semantic check rejects the
    /// whole update; `self` is never modified.
    pub fn apply_updates(&self, updates: &BTreeMap<String, String>) -> Result<Self, CoreError> {
        let mut record = self.to_record();

        for (raw_key, raw_value) in updates {
            let key = schema::canonical_key(raw_key)
                .ok_or_else(|| CoreError::UnknownSetting(raw_key.clone()))?;
            let kind = record
                .get(key)
                .map(SettingValue::kind)
                .ok_or_else(|| CoreError::UnknownSetting(raw_key.clone()))?;
            let value =
                SettingValue::coerce(kind, raw_value).ok_or_else(|| CoreError::InvalidSetting {
                    key: key.to_string(),
                    expected: kind.as_str(),
                    value: raw_value.clone(),
                })?;
            record.replace(key, value);
        }

        Self::from_record(&record)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.poll_interval_minutes) * 60)
    }

    /// The alert policy with its parameters.
    pub fn policy(&self) -> AlertPolicy {
        match self.alert_policy {
            AlertPolicyKind::Edge => AlertPolicy::EdgeTriggered,
            AlertPolicyKind::Count => AlertPolicy::CountThreshold {
                count: self.alert_repeat_count,
            },
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("location_name", &self.location_name)
            .field("poll_interval_minutes", &self.poll_interval_minutes)
            .field("temp_high_threshold", &self.temp_high_threshold)
            .field("temp_low_threshold", &self.temp_low_threshold)
            .field("co2_threshold", &self.co2_threshold)
            .field("alert_repeat_count", &self.alert_repeat_count)
            .field("alert_policy", &self.alert_policy)
            .field("slack", &self.slack)
            .field("adafruit", &self.adafruit)
            .finish()
    }
}

impl fmt::Debug for SlackSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlackSettings")
            .field("api_token", &REDACTED_VALUE)
            .field("channel", &self.channel)
            .finish()
    }
}

impl fmt::Debug for AdafruitSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdafruitSettings")
            .field("username", &self.username)
            .field("key", &REDACTED_VALUE)
            .field("group", &self.group)
            .field("temp_feed", &self.temp_feed)
            .field("humidity_feed", &self.humidity_feed)
            .field("co2_feed", &self.co2_feed)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Record accessors
// ---------------------------------------------------------------------------

fn invalid(key: &str, message: &str) -> CoreError {
    CoreError::Validation {
        key: key.to_string(),
        message: message.to_string(),
    }
}

fn lookup<'a>(record: &'a SettingsRecord, key: &str) -> Result<&'a SettingValue, CoreError> {
    record
        .get(key)
        .ok_or_else(|| CoreError::MissingSetting(key.to_string()))
}

fn mismatch(key: &str, expected: ValueKind, found: &SettingValue) -> CoreError {
    CoreError::InvalidSetting {
        key: key.to_string(),
        expected: expected.as_str(),
        value: found.to_string(),
    }
}

fn text(record: &SettingsRecord, key: &str) -> Result<String, CoreError> {
    let value = lookup(record, key)?;
    value
        .as_text()
        .map(str::to_string)
        .ok_or_else(|| mismatch(key, ValueKind::Text, value))
}

fn float(record: &SettingsRecord, key: &str) -> Result<f64, CoreError> {
    let value = lookup(record, key)?;
    value
        .as_float()
        .ok_or_else(|| mismatch(key, ValueKind::Float, value))
}

fn positive_u32(record: &SettingsRecord, key: &str) -> Result<u32, CoreError> {
    let value = lookup(record, key)?;
    let raw = value
        .as_integer()
        .ok_or_else(|| mismatch(key, ValueKind::Integer, value))?;
    u32::try_from(raw)
        .ok()
        .filter(|v| *v > 0)
        .ok_or_else(|| invalid(key, &format!("must be a positive integer, got {raw}")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
