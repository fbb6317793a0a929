//! Contract between the HTTP control surface and the settings store.
//!
//! The bridge reads the current settings, applies type-preserving writes
//! and triggers the host reboot. It knows nothing about HTTP; handlers
//! translate requests into [`WriteRequest`] and errors into responses.

use std::collections::BTreeMap;
use std::sync::Arc;

use airwatch_core::error::CoreError;
use airwatch_core::settings::schema::{canonical_key, spec_for};
use airwatch_core::settings::Settings;
use airwatch_store::{SettingsStore, StoreError};
use serde_json::{Map, Value};

use crate::reboot::RebootCommand;

/// Request field carrying an action rather than a setting.
pub const ACTION_FIELD: &str = "action";

/// The only supported action.
pub const ACTION_REBOOT: &str = "reboot";

/// A parsed settings write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteRequest {
    /// Raw string values keyed as the client sent them.
    pub updates: BTreeMap<String, String>,
    pub reboot: bool,
}

impl WriteRequest {
    /// Build a request from a JSON object.
    ///
    /// Strings are taken as-is and numbers by their JSON text. Any other
    /// value type is rejected for the key it was sent under.
    pub fn from_json(body: Map<String, Value>) -> Result<Self, CoreError> {
        let mut request = WriteRequest::default();

        for (key, value) in body {
            if key == ACTION_FIELD {
                match value.as_str() {
                    Some(ACTION_REBOOT) => request.reboot = true,
                    _ => {
                        return Err(CoreError::Validation {
                            key,
                            message: format!("unsupported action {value}"),
                        })
                    }
                }
                continue;
            }

            let raw = match value {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                other => {
                    let spec = canonical_key(&key)
                        .and_then(spec_for)
                        .ok_or_else(|| CoreError::UnknownSetting(key.clone()))?;
                    return Err(CoreError::InvalidSetting {
                        key: spec.key.to_string(),
                        expected: spec.kind.as_str(),
                        value: other.to_string(),
                    });
                }
            };
            request.updates.insert(key, raw);
        }

        Ok(request)
    }
}

/// Result of a successful write.
#[derive(Debug, Clone)]
pub struct WriteOutcome {
    pub settings: Arc<Settings>,
    /// A reboot was requested and has been scheduled.
    pub rebooting: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

#[derive(Clone)]
pub struct SettingsBridge {
    store: SettingsStore,
    reboot: Option<Arc<RebootCommand>>,
}

impl SettingsBridge {
    /// `reboot` is `None` when no reboot command is configured; reboot
    /// requests are then rejected.
    pub fn new(store: SettingsStore, reboot: Option<RebootCommand>) -> Self {
        Self {
            store,
            reboot: reboot.map(Arc::new),
        }
    }

    pub fn store(&self) -> &SettingsStore {
        &self.store
    }

    /// The full current settings record.
    pub async fn read(&self) -> Arc<Settings> {
        self.store.snapshot().await
    }

    /// Validate and persist `request`, then schedule a reboot if asked.
    ///
    /// The write is all-or-nothing: any rejected key leaves the stored
    /// settings untouched and no reboot is scheduled.
    pub async fn write(&self, request: &WriteRequest) -> Result<WriteOutcome, BridgeError> {
        let reboot = match (request.reboot, &self.reboot) {
            (false, _) => None,
            (true, Some(command)) => Some(Arc::clone(command)),
            (true, None) => {
                return Err(CoreError::Validation {
                    key: ACTION_FIELD.to_string(),
                    message: "reboot is not available on this host".to_string(),
                }
                .into())
            }
        };

        let settings = if request.updates.is_empty() {
            self.store.snapshot().await
        } else {
            let settings = self.store.update(&request.updates).await?;
            let keys: Vec<&str> = request.updates.keys().map(String::as_str).collect();
            tracing::info!(keys = ?keys, "Settings updated via control surface");
            settings
        };

        if let Some(command) = reboot {
            tracing::warn!("Reboot requested via control surface");
            command.spawn();
        }

        Ok(WriteOutcome {
            settings,
            rebooting: request.reboot,
        })
    }
}
