//! HTTP-level tests for the Slack and Adafruit IO clients against a local
//! fake server.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use airwatch_events::{
    publish_with_retry, AdafruitIoSink, DeliveryOutcome, NotificationChannel, RetryPolicy,
    SlackNotifier, TelemetryError, TelemetrySink,
};
use assert_matches::assert_matches;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

#[derive(Clone, Default)]
struct Recorder {
    requests: Arc<Mutex<Vec<(String, HeaderMap, Value)>>>,
    calls: Arc<AtomicU32>,
    /// Statuses to return for successive calls; 200 once exhausted.
    statuses: Arc<Mutex<Vec<StatusCode>>>,
}

impl Recorder {
    fn with_statuses(statuses: Vec<StatusCode>) -> Self {
        Self {
            statuses: Arc::new(Mutex::new(statuses)),
            ..Self::default()
        }
    }

    fn next_status(&self) -> StatusCode {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut statuses = self.statuses.lock().unwrap();
        if statuses.is_empty() {
            StatusCode::OK
        } else {
            statuses.remove(0)
        }
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

fn no_delay() -> RetryPolicy {
    RetryPolicy {
        delay: Duration::ZERO,
        ..RetryPolicy::default()
    }
}

// ---------------------------------------------------------------------------
// Slack
// ---------------------------------------------------------------------------

async fn slack_router(recorder: Recorder, reply: Value) -> String {
    let router = Router::new()
        .route(
            "/api/chat.postMessage",
            post(
                move |State(rec): State<Recorder>, headers: HeaderMap, Json(body): Json<Value>| {
                    let reply = reply.clone();
                    async move {
                        let status = rec.next_status();
                        rec.requests
                            .lock()
                            .unwrap()
                            .push(("chat.postMessage".into(), headers, body));
                        (status, Json(reply))
                    }
                },
            ),
        )
        .with_state(recorder);
    format!("{}/api", serve(router).await)
}

#[tokio::test]
async fn slack_posts_channel_and_text_with_bearer_token() {
    let recorder = Recorder::default();
    let base = slack_router(recorder.clone(), json!({ "ok": true })).await;
    let notifier = SlackNotifier::new(base, "xoxb-test", "#alerts").unwrap();

    notifier.send("ALERT: lab too hot").await.unwrap();

    let requests = recorder.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    let (_, headers, body) = &requests[0];
    assert_eq!(headers["authorization"], "Bearer xoxb-test");
    assert_eq!(body["channel"], "#alerts");
    assert_eq!(body["text"], "ALERT: lab too hot");
}

#[tokio::test]
async fn slack_api_error_is_reported() {
    let recorder = Recorder::default();
    let base = slack_router(
        recorder.clone(),
        json!({ "ok": false, "error": "channel_not_found" }),
    )
    .await;
    let notifier = SlackNotifier::new(base, "xoxb-test", "#missing").unwrap();

    let err = notifier.send("hello").await.unwrap_err();
    assert!(err.to_string().contains("channel_not_found"));
}

#[tokio::test]
async fn slack_http_failure_is_reported() {
    let recorder = Recorder::with_statuses(vec![StatusCode::INTERNAL_SERVER_ERROR]);
    let base = slack_router(recorder.clone(), json!({ "ok": false })).await;
    let notifier = SlackNotifier::new(base, "xoxb-test", "#alerts").unwrap();

    let err = notifier.send("hello").await.unwrap_err();
    assert!(err.to_string().contains("HTTP 500"));
}

// ---------------------------------------------------------------------------
// Adafruit IO
// ---------------------------------------------------------------------------

async fn adafruit_router(recorder: Recorder) -> String {
    let router = Router::new()
        .route(
            "/api/v2/{username}/feeds/{feed_key}/data",
            post(
                |State(rec): State<Recorder>,
                 Path((username, feed_key)): Path<(String, String)>,
                 headers: HeaderMap,
                 Json(body): Json<Value>| async move {
                    let status = rec.next_status();
                    rec.requests
                        .lock()
                        .unwrap()
                        .push((format!("{username}/{feed_key}"), headers, body));
                    (status, Json(json!({ "id": "1" })))
                },
            ),
        )
        .with_state(recorder);
    format!("{}/api/v2", serve(router).await)
}

#[tokio::test]
async fn adafruit_posts_value_to_group_feed() {
    let recorder = Recorder::default();
    let base = adafruit_router(recorder.clone()).await;
    let sink = AdafruitIoSink::new(base, "ops", "aio-test").unwrap();

    let outcome = sink.publish("lab.temperature", 72.5).await;
    assert_eq!(outcome, DeliveryOutcome::Delivered);

    let requests = recorder.requests.lock().unwrap();
    let (target, headers, body) = &requests[0];
    assert_eq!(target, "ops/lab.temperature");
    assert_eq!(headers["x-aio-key"], "aio-test");
    assert_eq!(body["value"], 72.5);
}

#[tokio::test]
async fn adafruit_feed_names_stay_in_their_path_segment() {
    let recorder = Recorder::default();
    let base = adafruit_router(recorder.clone()).await;
    let sink = AdafruitIoSink::new(base, "ops team", "aio-test").unwrap();

    let outcome = sink.publish("lab/east.temp", 71.0).await;
    assert_eq!(outcome, DeliveryOutcome::Delivered);

    let requests = recorder.requests.lock().unwrap();
    assert_eq!(requests[0].0, "ops team/lab/east.temp");
}

#[tokio::test]
async fn adafruit_retries_server_errors_then_succeeds() {
    let recorder = Recorder::with_statuses(vec![
        StatusCode::SERVICE_UNAVAILABLE,
        StatusCode::BAD_GATEWAY,
    ]);
    let base = adafruit_router(recorder.clone()).await;
    let sink = AdafruitIoSink::new(base, "ops", "aio-test").unwrap();

    let attempts = publish_with_retry(&sink, "lab.co2", 640.0, &no_delay())
        .await
        .unwrap();
    assert_eq!(attempts, 3);
    assert_eq!(recorder.calls(), 3);
}

#[tokio::test]
async fn adafruit_gives_up_after_three_server_errors() {
    let recorder = Recorder::with_statuses(vec![StatusCode::SERVICE_UNAVAILABLE; 5]);
    let base = adafruit_router(recorder.clone()).await;
    let sink = AdafruitIoSink::new(base, "ops", "aio-test").unwrap();

    let err = publish_with_retry(&sink, "lab.co2", 640.0, &no_delay())
        .await
        .unwrap_err();
    assert_matches!(err, TelemetryError::Exhausted { attempts: 3, .. });
    assert_eq!(recorder.calls(), 3);
}

#[tokio::test]
async fn adafruit_auth_failure_is_not_retried() {
    let recorder = Recorder::with_statuses(vec![StatusCode::UNAUTHORIZED; 5]);
    let base = adafruit_router(recorder.clone()).await;
    let sink = AdafruitIoSink::new(base, "ops", "wrong-key").unwrap();

    let err = publish_with_retry(&sink, "lab.co2", 640.0, &no_delay())
        .await
        .unwrap_err();
    assert_matches!(err, TelemetryError::Rejected { ref reason, .. } if reason == "HTTP 401");
    assert_eq!(recorder.calls(), 1);
}

#[tokio::test]
async fn adafruit_unreachable_host_is_retryable() {
    // Bind then drop to get a port nothing is listening on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let sink = AdafruitIoSink::new(format!("http://{addr}/api/v2"), "ops", "k").unwrap();
    assert_matches!(
        sink.publish("lab.rh", 40.0).await,
        DeliveryOutcome::RetryableFailure(_)
    );
}
