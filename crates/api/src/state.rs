use std::sync::Arc;

use crate::bridge::SettingsBridge;
use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; the settings store behind the bridge is shared with
/// the monitoring loop.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub bridge: SettingsBridge,
}
