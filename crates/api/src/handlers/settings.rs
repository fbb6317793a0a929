//! Handlers for the settings control surface.
//!
//! Reads return the full typed settings record. Writes accept a JSON object
//! of `key: value` pairs plus an optional `"action": "reboot"`; every value
//! is coerced to the type its key already has, and one bad key rejects the
//! whole write.

use airwatch_core::settings::schema::SettingsRecord;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde_json::{Map, Value};

use crate::bridge::WriteRequest;
use crate::error::{AppError, AppResult};
use crate::response::{DataResponse, WriteResponse};
use crate::state::AppState;

/// GET /api/v1/settings
pub async fn get_settings(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<SettingsRecord>>> {
    let settings = state.bridge.read().await;
    Ok(Json(DataResponse {
        data: settings.to_record(),
    }))
}

/// POST /api/v1/settings
pub async fn update_settings(
    State(state): State<AppState>,
    body: Result<Json<Map<String, Value>>, JsonRejection>,
) -> AppResult<Json<WriteResponse<SettingsRecord>>> {
    let Json(body) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let request = WriteRequest::from_json(body)?;

    let outcome = state.bridge.write(&request).await?;

    Ok(Json(WriteResponse {
        data: outcome.settings.to_record(),
        rebooting: outcome.rebooting,
    }))
}

/// POST /api/v1/settings/reload
///
/// Picks up edits made to the settings file outside the process.
pub async fn reload_settings(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<SettingsRecord>>> {
    let settings = state
        .bridge
        .store()
        .reload()
        .await
        .map_err(AppError::SettingsFile)?;
    Ok(Json(DataResponse {
        data: settings.to_record(),
    }))
}
