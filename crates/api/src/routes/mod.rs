pub mod health;
pub mod settings;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /settings           read (GET), write and optional reboot (POST)
/// /settings/reload    re-read the settings file from disk (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/settings", settings::router())
}
