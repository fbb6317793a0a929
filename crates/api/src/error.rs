use airwatch_core::error::CoreError;
use airwatch_store::StoreError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::bridge::BridgeError;

/// Application-level error type for HTTP handlers.
///
/// Implements [`IntoResponse`] to produce `{"error", "code"}` JSON bodies.
/// Errors about a single setting also carry its `"key"`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The settings file on disk could not be loaded.
    #[error("Failed to load settings file: {0}")]
    SettingsFile(StoreError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl From<BridgeError> for AppError {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::Core(e) => AppError::Core(e),
            BridgeError::Store(e) => AppError::Store(e),
        }
    }
}

fn classify_core_error(err: &CoreError) -> (StatusCode, &'static str) {
    match err {
        CoreError::InvalidSetting { .. } => (StatusCode::BAD_REQUEST, "INVALID_SETTING"),
        CoreError::UnknownSetting(_) => (StatusCode::BAD_REQUEST, "UNKNOWN_SETTING"),
        CoreError::Validation { .. } | CoreError::MissingSetting(_) => {
            (StatusCode::BAD_REQUEST, "VALIDATION_ERROR")
        }
        // Only reachable when the file on disk is broken.
        CoreError::Parse { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, key) = match &self {
            AppError::Core(e) | AppError::Store(StoreError::Core(e)) => {
                let (status, code) = classify_core_error(e);
                (status, code, e.to_string(), e.key())
            }
            AppError::Store(e) => {
                tracing::error!(error = %e, "Settings storage error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORAGE_ERROR",
                    "Failed to persist settings".to_string(),
                    None,
                )
            }
            AppError::SettingsFile(e) => {
                tracing::error!(error = %e, "Settings file could not be loaded");
                let key = match e {
                    StoreError::Core(core) => core.key(),
                    StoreError::Io { .. } => None,
                };
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORAGE_ERROR",
                    "Failed to load settings file".to_string(),
                    key,
                )
            }
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone(), None)
            }
        };

        let body = match key {
            Some(key) => json!({ "error": message, "code": code, "key": key }),
            None => json!({ "error": message, "code": code }),
        };

        (status, axum::Json(body)).into_response()
    }
}
