//! Gotify delivery client
//!
//! Pushes rendered notifications to a Gotify server's `/message` endpoint.
//! Bodies are marked as markdown via the `client::display` extra so the
//! fenced payload block renders verbatim. Transient failures (network,
//! 5xx) are retried with exponential backoff; 4xx responses are not.

use agb_core::classify::NotificationDraft;
use agb_core::config::GotifySettings;
use agb_core::sink::{NotificationSink, SinkError};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Gotify client configuration
#[derive(Debug, Clone)]
pub struct GotifyConfig {
    /// Base URL of the Gotify server
    pub url: String,

    /// Application token
    pub token: String,

    /// Request timeout
    pub timeout: Duration,

    /// Maximum number of retries for transient failures
    pub max_retries: u32,

    /// Initial retry delay (doubles with each retry)
    pub initial_retry_delay: Duration,

    /// Maximum retry delay
    pub max_retry_delay: Duration,
}

impl GotifyConfig {
    pub fn from_settings(settings: &GotifySettings) -> Self {
        Self {
            url: settings.url.clone(),
            token: settings.token.clone(),
            timeout: Duration::from_secs(settings.timeout_secs),
            max_retries: settings.max_retries,
            initial_retry_delay: Duration::from_millis(settings.retry_delay_ms),
            max_retry_delay: Duration::from_secs(30),
        }
    }
}

impl Default for GotifyConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8090".to_string(),
            token: String::new(),
            timeout: Duration::from_secs(30),
            max_retries: 3,
            initial_retry_delay: Duration::from_millis(500),
            max_retry_delay: Duration::from_secs(30),
        }
    }
}

/// Wire shape of a Gotify message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub title: String,
    pub message: String,
    pub priority: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extras: Option<serde_json::Value>,
}

impl Message {
    /// Build a markdown-rendered message from a draft. The display hint
    /// tells Gotify clients to treat the body as markdown.
    pub fn markdown(draft: &NotificationDraft) -> Self {
        Self {
            title: draft.title.clone(),
            message: draft.body.clone(),
            priority: draft.priority,
            extras: Some(serde_json::json!({
                "client::display": {
                    "contentType": "text/markdown",
                }
            })),
        }
    }
}

/// Gotify-specific error types
#[derive(Debug, Error)]
pub enum GotifyError {
    /// Network/HTTP error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Gotify rejected the message (4xx) - not retried
    #[error("Gotify rejected the message ({status}): {body}")]
    Rejected { status: StatusCode, body: String },

    /// Server-side failure (5xx) - retried
    #[error("Gotify server error ({status}): {body}")]
    Server { status: StatusCode, body: String },
}

impl GotifyError {
    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, GotifyError::Network(_) | GotifyError::Server { .. })
    }
}

/// HTTP client for the Gotify message API
pub struct GotifyClient {
    config: GotifyConfig,
    client: Client,
}

impl GotifyClient {
    /// Create a new Gotify client
    pub fn new(config: GotifyConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(format!(
                "authentik-gotify-bridge/{}",
                env!("CARGO_PKG_VERSION")
            ))
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    async fn push(&self, message: &Message) -> Result<(), GotifyError> {
        let url = format!("{}/message", self.config.url.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .header("X-Gotify-Key", &self.config.token)
            .json(message)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            Err(GotifyError::Rejected { status, body })
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(GotifyError::Server { status, body })
        }
    }

    /// Send a message, retrying transient failures with backoff
    pub async fn send_message(&self, message: &Message) -> Result<(), GotifyError> {
        let mut delay = self.config.initial_retry_delay;
        let mut attempts = 0;

        loop {
            match self.push(message).await {
                Ok(()) => {
                    if attempts > 0 {
                        debug!("Gotify push succeeded after {} retries", attempts);
                    }
                    return Ok(());
                }
                Err(e) if e.is_retryable() && attempts < self.config.max_retries => {
                    attempts += 1;
                    warn!(
                        "Gotify push failed (attempt {}), retrying in {:?}: {}",
                        attempts, delay, e
                    );
                    tokio::time::sleep(delay).await;
                    delay = std::cmp::min(delay * 2, self.config.max_retry_delay);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl NotificationSink for GotifyClient {
    async fn send(&self, draft: &NotificationDraft) -> Result<(), SinkError> {
        let message = Message::markdown(draft);
        self.send_message(&message)
            .await
            .map_err(|e| SinkError::Delivery(e.to_string()))?;
        debug!("Delivered notification: {}", draft.title);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn draft() -> NotificationDraft {
        NotificationDraft {
            title: "Authentik: Failed Login Attempt".to_string(),
            body: "Authentik instance: prod-idp\n\n```\n{}\n```".to_string(),
            priority: 7,
        }
    }

    fn test_config(url: String) -> GotifyConfig {
        GotifyConfig {
            url,
            token: "AbCdEf123456".to_string(),
            timeout: Duration::from_secs(5),
            max_retries: 2,
            initial_retry_delay: Duration::from_millis(1),
            max_retry_delay: Duration::from_millis(4),
        }
    }

    #[test]
    fn test_markdown_message_shape() {
        let message = Message::markdown(&draft());
        let value = serde_json::to_value(&message).unwrap();

        assert_eq!(value["title"], "Authentik: Failed Login Attempt");
        assert_eq!(value["priority"], 7);
        assert_eq!(
            value["extras"]["client::display"]["contentType"],
            "text/markdown"
        );
    }

    #[tokio::test]
    async fn test_send_posts_message_with_token() {
        let server = MockServer::start().await;
        let expected = serde_json::to_string(&Message::markdown(&draft())).unwrap();

        Mock::given(method("POST"))
            .and(path("/message"))
            .and(header("X-Gotify-Key", "AbCdEf123456"))
            .and(body_json_string(expected))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = GotifyClient::new(test_config(server.uri()));
        client.send(&draft()).await.unwrap();
    }

    #[tokio::test]
    async fn test_retries_on_server_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/message"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/message"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = GotifyClient::new(test_config(server.uri()));
        client
            .send_message(&Message::markdown(&draft()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/message"))
            .respond_with(ResponseTemplate::new(503))
            // initial attempt + max_retries
            .expect(3)
            .mount(&server)
            .await;

        let client = GotifyClient::new(test_config(server.uri()));
        let err = client
            .send_message(&Message::markdown(&draft()))
            .await
            .unwrap_err();
        assert!(matches!(err, GotifyError::Server { .. }));
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/message"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let client = GotifyClient::new(test_config(server.uri()));
        let err = client
            .send_message(&Message::markdown(&draft()))
            .await
            .unwrap_err();
        assert!(matches!(err, GotifyError::Rejected { .. }));
        assert!(!err.is_retryable());
    }
}
