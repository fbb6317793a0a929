//! Slack notification channel.
//!
//! [`SlackNotifier`] posts alert text to a single channel through the Slack
//! Web API `chat.postMessage` method. Slack reports most failures with an
//! HTTP 200 and `"ok": false`, so both the status and the body are checked.

use serde::{Deserialize, Serialize};

use super::{NotificationChannel, NotifyError, REQUEST_TIMEOUT};

/// Default Slack Web API base URL.
pub const DEFAULT_SLACK_API_URL: &str = "https://slack.com/api";

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SlackError {
    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Slack returned a non-2xx status code.
    #[error("Slack returned HTTP {0}")]
    HttpStatus(u16),

    /// Slack accepted the request but reported an API error.
    #[error("Slack API error: {0}")]
    Api(String),
}

impl From<SlackError> for NotifyError {
    fn from(err: SlackError) -> Self {
        NotifyError(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct PostMessage<'a> {
    channel: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

// ---------------------------------------------------------------------------
// SlackNotifier
// ---------------------------------------------------------------------------

/// Posts messages to one Slack channel with a bot token.
pub struct SlackNotifier {
    client: reqwest::Client,
    base_url: String,
    token: String,
    channel: String,
}

impl SlackNotifier {
    /// Build a notifier for `channel` using `token`.
    ///
    /// `base_url` is normally [`DEFAULT_SLACK_API_URL`].
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        channel: impl Into<String>,
    ) -> Result<Self, SlackError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            channel: channel.into(),
        })
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Post `text` to the configured channel.
    pub async fn post_message(&self, text: &str) -> Result<(), SlackError> {
        let url = format!("{}/chat.postMessage", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&PostMessage {
                channel: &self.channel,
                text,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SlackError::HttpStatus(response.status().as_u16()));
        }

        let body: PostMessageResponse = response.json().await?;
        if !body.ok {
            return Err(SlackError::Api(
                body.error.unwrap_or_else(|| "unknown_error".to_string()),
            ));
        }
        Ok(())
    }
}

impl NotificationChannel for SlackNotifier {
    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        self.post_message(text).await.map_err(NotifyError::from)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
