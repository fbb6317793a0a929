//! Shared helpers for control surface integration tests.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use airwatch_api::bridge::SettingsBridge;
use airwatch_api::config::{SensorSource, ServerConfig};
use airwatch_api::reboot::RebootCommand;
use airwatch_api::router::build_app_router;
use airwatch_api::state::AppState;
use airwatch_store::SettingsStore;

pub const SETTINGS: &str = "\
[General]
SENSOR_LOCATION_NAME = Server Room
MINUTES_BETWEEN_READS = 5
SENSOR_THRESHOLD_TEMP = 85
SENSOR_LOWER_THRESHOLD_TEMP = 50
SENSOR_CO2_THRESHOLD = 1000
THRESHOLD_COUNT = 3
SLACK_API_TOKEN = xoxb-test
SLACK_CHANNEL = #alerts
ADAFRUIT_IO_USERNAME = ops
ADAFRUIT_IO_KEY = aio-test
ADAFRUIT_IO_GROUP_NAME = lab
ADAFRUIT_IO_TEMP_FEED = temperature
ADAFRUIT_IO_HUMIDITY_FEED = humidity
ADAFRUIT_IO_CO2_FEED = co2
";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config(dir: &tempfile::TempDir) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        request_timeout_secs: 30,
        settings_path: dir.path().join("SingleSensorSettings.conf"),
        readings_log_path: dir.path().join("sensor_readings.log"),
        error_log_path: dir.path().join("error_log.log"),
        sensor: SensorSource::Simulated,
        reboot_command: String::new(),
        slack_api_url: "http://127.0.0.1:9/api".to_string(),
        adafruit_io_url: "http://127.0.0.1:9/api/v2".to_string(),
    }
}

/// A settings file in a temp directory plus the app serving it.
pub struct TestApp {
    pub dir: tempfile::TempDir,
    pub store: SettingsStore,
    pub app: Router,
}

impl TestApp {
    pub fn settings_path(&self) -> PathBuf {
        self.dir.path().join("SingleSensorSettings.conf")
    }

    /// File created by the test reboot command.
    pub fn reboot_marker(&self) -> PathBuf {
        self.dir.path().join("rebooted")
    }
}

/// Build the full application router over a fresh settings file.
///
/// The reboot command touches [`TestApp::reboot_marker`] instead of
/// rebooting.
pub async fn build_test_app() -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);
    std::fs::write(&config.settings_path, SETTINGS).unwrap();

    let store = SettingsStore::open(&config.settings_path).await.unwrap();
    let reboot = RebootCommand::from_command_line(&format!(
        "touch {}",
        dir.path().join("rebooted").display()
    ))
    .map(|command| command.with_delay(Duration::ZERO));

    let state = AppState {
        config: Arc::new(config),
        bridge: SettingsBridge::new(store.clone(), reboot),
    };

    TestApp {
        app: build_app_router(state),
        dir,
        store,
    }
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Response<Body> {
    post_raw(app, uri, body.to_string()).await
}

pub async fn post_raw(app: Router, uri: &str, body: String) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Poll for `path` to appear, for work spawned after a response.
pub async fn wait_for_file(path: &std::path::Path) -> bool {
    for _ in 0..100 {
        if path.exists() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}
