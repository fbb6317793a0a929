//! The settings schema: every known key, its value type, and the legacy
//! upper-case name it had in older configuration files.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

pub const KEY_LOCATION_NAME: &str = "location_name";
pub const KEY_POLL_INTERVAL: &str = "poll_interval";
pub const KEY_TEMP_HIGH_THRESHOLD: &str = "temp_high_threshold";
pub const KEY_TEMP_LOW_THRESHOLD: &str = "temp_low_threshold";
pub const KEY_CO2_THRESHOLD: &str = "co2_threshold";
pub const KEY_ALERT_REPEAT_COUNT: &str = "alert_repeat_count";
pub const KEY_ALERT_POLICY: &str = "alert_policy";
pub const KEY_SLACK_API_TOKEN: &str = "slack_api_token";
pub const KEY_SLACK_CHANNEL: &str = "slack_channel";
pub const KEY_ADAFRUIT_IO_USERNAME: &str = "adafruit_io_username";
pub const KEY_ADAFRUIT_IO_KEY: &str = "adafruit_io_key";
pub const KEY_ADAFRUIT_IO_GROUP: &str = "adafruit_io_group";
pub const KEY_ADAFRUIT_IO_TEMP_FEED: &str = "adafruit_io_temp_feed";
pub const KEY_ADAFRUIT_IO_HUMIDITY_FEED: &str = "adafruit_io_humidity_feed";
pub const KEY_ADAFRUIT_IO_CO2_FEED: &str = "adafruit_io_co2_feed";

/// Placeholder written in place of secret values in debug output.
pub const REDACTED_VALUE: &str = "[REDACTED]";

// ---------------------------------------------------------------------------
// Value types
// ---------------------------------------------------------------------------

/// The declared type of a setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Text,
    Integer,
    Float,
}

impl ValueKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ValueKind::Text => "string",
            ValueKind::Integer => "integer",
            ValueKind::Float => "float",
        }
    }
}

/// A single typed setting value.
///
/// Serializes untagged so a settings record renders as a plain JSON object
/// of strings and numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl SettingValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            SettingValue::Text(_) => ValueKind::Text,
            SettingValue::Integer(_) => ValueKind::Integer,
            SettingValue::Float(_) => ValueKind::Float,
        }
    }

    /// Parse `raw` as a value of `kind`, returning `None` if it does not fit.
    ///
    /// Surrounding whitespace is ignored. Text must be a single line with no
    /// control characters; floats must be finite.
    pub fn coerce(kind: ValueKind, raw: &str) -> Option<Self> {
        match kind {
            ValueKind::Text => {
                let text = raw.trim();
                (!text.chars().any(char::is_control)).then(|| SettingValue::Text(text.to_string()))
            }
            ValueKind::Integer => raw.trim().parse().ok().map(SettingValue::Integer),
            ValueKind::Float => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(SettingValue::Float),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            SettingValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            SettingValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            SettingValue::Float(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for SettingValue {
    /// Floats use the shortest representation that round-trips and always
    /// keep a decimal point (`85.0`, not `85`).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Text(s) => f.write_str(s),
            SettingValue::Integer(v) => write!(f, "{v}"),
            SettingValue::Float(v) => write!(f, "{v:?}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// Declaration of one setting.
#[derive(Debug, Clone, Copy)]
pub struct SettingSpec {
    pub key: &'static str,
    pub kind: ValueKind,
    /// Name used by older configuration files, matched case-insensitively.
    pub legacy_key: Option<&'static str>,
    /// Raw default for optional keys; `None` means the key is required.
    pub default: Option<&'static str>,
    /// Credentials are never logged.
    pub secret: bool,
}

const fn required(key: &'static str, kind: ValueKind, legacy_key: &'static str) -> SettingSpec {
    SettingSpec {
        key,
        kind,
        legacy_key: Some(legacy_key),
        default: None,
        secret: false,
    }
}

const fn secret(key: &'static str, legacy_key: &'static str) -> SettingSpec {
    SettingSpec {
        key,
        kind: ValueKind::Text,
        legacy_key: Some(legacy_key),
        default: None,
        secret: true,
    }
}

/// Every known setting, in the order they are written to disk.
pub const SCHEMA: &[SettingSpec] = &[
    required(KEY_LOCATION_NAME, ValueKind::Text, "SENSOR_LOCATION_NAME"),
    required(KEY_POLL_INTERVAL, ValueKind::Integer, "MINUTES_BETWEEN_READS"),
    required(KEY_TEMP_HIGH_THRESHOLD, ValueKind::Float, "SENSOR_THRESHOLD_TEMP"),
    required(
        KEY_TEMP_LOW_THRESHOLD,
        ValueKind::Float,
        "SENSOR_LOWER_THRESHOLD_TEMP",
    ),
    required(KEY_CO2_THRESHOLD, ValueKind::Float, "SENSOR_CO2_THRESHOLD"),
    required(KEY_ALERT_REPEAT_COUNT, ValueKind::Integer, "THRESHOLD_COUNT"),
    SettingSpec {
        key: KEY_ALERT_POLICY,
        kind: ValueKind::Text,
        legacy_key: None,
        default: Some("edge"),
        secret: false,
    },
    secret(KEY_SLACK_API_TOKEN, "SLACK_API_TOKEN"),
    required(KEY_SLACK_CHANNEL, ValueKind::Text, "SLACK_CHANNEL"),
    required(KEY_ADAFRUIT_IO_USERNAME, ValueKind::Text, "ADAFRUIT_IO_USERNAME"),
    secret(KEY_ADAFRUIT_IO_KEY, "ADAFRUIT_IO_KEY"),
    required(KEY_ADAFRUIT_IO_GROUP, ValueKind::Text, "ADAFRUIT_IO_GROUP_NAME"),
    required(KEY_ADAFRUIT_IO_TEMP_FEED, ValueKind::Text, "ADAFRUIT_IO_TEMP_FEED"),
    required(
        KEY_ADAFRUIT_IO_HUMIDITY_FEED,
        ValueKind::Text,
        "ADAFRUIT_IO_HUMIDITY_FEED",
    ),
    required(KEY_ADAFRUIT_IO_CO2_FEED, ValueKind::Text, "ADAFRUIT_IO_CO2_FEED"),
];

/// Look up a setting by canonical key.
pub fn spec_for(key: &str) -> Option<&'static SettingSpec> {
    SCHEMA.iter().find(|s| s.key == key)
}

/// Map any accepted spelling of a key (canonical or legacy, any case) to its
/// canonical name.
pub fn canonical_key(raw: &str) -> Option<&'static str> {
    let lower = raw.trim().to_ascii_lowercase();
    SCHEMA
        .iter()
        .find(|s| {
            s.key == lower
                || s
                    .legacy_key
                    .is_some_and(|legacy| legacy.eq_ignore_ascii_case(&lower))
        })
        .map(|s| s.key)
}

/// Whether the key holds a credential.
pub fn is_secret_key(key: &str) -> bool {
    spec_for(key).is_some_and(|s| s.secret)
}

// ---------------------------------------------------------------------------
// SettingsRecord
// ---------------------------------------------------------------------------

/// The flat, typed key-value record persisted to disk.
///
/// Always complete: building one from raw strings fills optional keys with
/// their defaults and rejects missing required keys.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SettingsRecord(BTreeMap<String, SettingValue>);

impl SettingsRecord {
    /// Type every schema key from its raw string.
    ///
    /// Keys in `raw` must already be canonical. Unknown keys are ignored.
    pub fn from_raw(raw: &BTreeMap<String, String>) -> Result<Self, CoreError> {
        let mut values = BTreeMap::new();
        for spec in SCHEMA {
            let text = match (raw.get(spec.key), spec.default) {
                (Some(text), _) => text.as_str(),
                (None, Some(default)) => default,
                (None, None) => return Err(CoreError::MissingSetting(spec.key.to_string())),
            };
            let value =
                SettingValue::coerce(spec.kind, text).ok_or_else(|| CoreError::InvalidSetting {
                    key: spec.key.to_string(),
                    expected: spec.kind.as_str(),
                    value: text.to_string(),
                })?;
            values.insert(spec.key.to_string(), value);
        }
        Ok(Self(values))
    }

    pub fn get(&self, key: &str) -> Option<&SettingValue> {
        self.0.get(key)
    }

    /// Overwrite an existing key. Returns `false` if the key is not present.
    pub fn replace(&mut self, key: &str, value: SettingValue) -> bool {
        match self.0.get_mut(key) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Iterate in schema order.
    pub fn iter_schema_order(&self) -> impl Iterator<Item = (&'static str, &SettingValue)> + '_ {
        SCHEMA
            .iter()
            .filter_map(|spec| self.0.get(spec.key).map(|value| (spec.key, value)))
    }

    pub(crate) fn insert(&mut self, key: &str, value: SettingValue) {
        self.0.insert(key.to_string(), value);
    }

    pub(crate) fn empty() -> Self {
        Self(BTreeMap::new())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
