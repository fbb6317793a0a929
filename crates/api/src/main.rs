//! `airwatch` -- environmental sensor monitor.
//!
//! Runs two long-lived tasks: the monitoring loop (poll sensor, alert via
//! Slack, publish to Adafruit IO) and the HTTP control surface for reading
//! and updating settings. SIGINT/SIGTERM stop both; the process exits once
//! the loop has finished its current tick.
//!
//! Process configuration comes from the environment (see
//! [`ServerConfig::from_env`]); domain settings come from the settings file.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use airwatch_agent::error_log::ErrorLogLayer;
use airwatch_agent::readings_log::ReadingsLog;
use airwatch_agent::{CommandSensor, Monitor, SensorReader, SimulatedSensor};
use airwatch_api::bridge::SettingsBridge;
use airwatch_api::config::{SensorSource, ServerConfig};
use airwatch_api::reboot::RebootCommand;
use airwatch_api::router::build_app_router;
use airwatch_api::state::AppState;
use airwatch_events::{AdafruitIoSink, SlackNotifier};
use airwatch_store::SettingsStore;

/// Fallback error log location when the environment is unusable.
const DEFAULT_ERROR_LOG_PATH: &str = "error_log.log";

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let config = ServerConfig::from_env();
    let error_log_path = config
        .as_ref()
        .map(|c| c.error_log_path.clone())
        .unwrap_or_else(|_| DEFAULT_ERROR_LOG_PATH.into());
    init_tracing(&error_log_path);

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid process configuration");
            std::process::exit(1);
        }
    };

    if let Err(e) = run(config).await {
        tracing::error!(error = %format!("{e:#}"), "airwatch failed");
        std::process::exit(1);
    }
}

fn init_tracing(error_log_path: &Path) {
    let error_log = ErrorLogLayer::open(error_log_path);
    let open_error = error_log.as_ref().err().map(ToString::to_string);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "airwatch_api=info,airwatch_agent=info,airwatch_events=info,airwatch_store=info,tower_http=info"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(error_log.ok())
        .init();

    if let Some(error) = open_error {
        tracing::warn!(path = %error_log_path.display(), %error, "Error log unavailable");
    }
}

async fn run(config: ServerConfig) -> anyhow::Result<()> {
    tracing::info!(host = %config.host, port = config.port, "Loaded server configuration");

    // -- Initializing --
    let store = SettingsStore::open(&config.settings_path)
        .await
        .with_context(|| format!("Failed to load settings from {}", config.settings_path.display()))?;
    let settings = store.snapshot().await;

    // Credentials are bound here and not re-read while running.
    let notifier = SlackNotifier::new(
        &config.slack_api_url,
        &settings.slack.api_token,
        &settings.slack.channel,
    )
    .context("Failed to build Slack client")?;
    let sink = AdafruitIoSink::new(
        &config.adafruit_io_url,
        &settings.adafruit.username,
        &settings.adafruit.key,
    )
    .context("Failed to build Adafruit IO client")?;
    let readings_log = ReadingsLog::new(&config.readings_log_path);

    let sensor = match &config.sensor {
        SensorSource::Command(command_line) => {
            let sensor = CommandSensor::from_command_line(command_line)
                .context("SENSOR_COMMAND is empty")?
                .connect()
                .await
                .context("Failed to initialize sensor")?;
            Sensor::Command(sensor)
        }
        SensorSource::Simulated => {
            tracing::warn!("Using simulated sensor readings");
            Sensor::Simulated(SimulatedSensor::new())
        }
        SensorSource::Unconfigured => {
            anyhow::bail!("No sensor configured: set SENSOR_COMMAND or SENSOR_SIMULATED=1")
        }
    };

    let reboot = RebootCommand::from_command_line(&config.reboot_command);
    if reboot.is_none() {
        tracing::warn!("REBOOT_COMMAND is empty, reboot requests will be rejected");
    }

    let addr = SocketAddr::new(
        config.host.parse().context("Invalid HOST address")?,
        config.port,
    );
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    let state = AppState {
        config: Arc::new(config),
        bridge: SettingsBridge::new(store.clone(), reboot),
    };
    let app = build_app_router(state);

    // -- Running --
    let cancel = CancellationToken::new();
    let monitor_handle = match sensor {
        Sensor::Command(sensor) => spawn_monitor(
            Monitor::new(store, sensor, notifier, sink, readings_log),
            cancel.clone(),
        ),
        Sensor::Simulated(sensor) => spawn_monitor(
            Monitor::new(store, sensor, notifier, sink, readings_log),
            cancel.clone(),
        ),
    };

    tracing::info!(%addr, location = %settings.location_name, "Starting server");
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel.clone()))
        .await;

    // -- ShuttingDown --
    cancel.cancel();
    if let Err(e) = monitor_handle.await {
        tracing::error!(error = %e, "Monitoring loop task failed");
    }
    served.context("Server error")?;

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// The sensor chosen at startup.
enum Sensor {
    Command(CommandSensor),
    Simulated(SimulatedSensor),
}

fn spawn_monitor<S>(
    mut monitor: Monitor<S, SlackNotifier, AdafruitIoSink>,
    cancel: CancellationToken,
) -> JoinHandle<()>
where
    S: SensorReader + Sync + 'static,
{
    tokio::spawn(async move { monitor.run(cancel).await })
}

/// Resolve on SIGINT or SIGTERM and cancel the monitoring loop.
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }

    cancel.cancel();
}
