use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::types::{Notifier, PullRequestNotice};

pub const DEFAULT_SLACK_API_URL: &str = "https://slack.com/api/chat.postMessage";

/// Renders the announcement for a pull request in Slack mrkdwn.
pub fn format_message(notice: &PullRequestNotice) -> String {
    format!(
        "New pull request by *{}* in *{}*: <{}|*{}*>",
        notice.author, notice.repo, notice.url, notice.title
    )
}

#[derive(Debug, Serialize)]
struct PostMessage<'a> {
    channel: &'a str,
    text: &'a str,
}

// Slack reports most API errors in-band with a 200 status.
#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Posts notices to one Slack channel with `chat.postMessage`.
pub struct SlackNotifier {
    client: reqwest::Client,
    endpoint: Url,
    channel: String,
    token: String,
}

impl SlackNotifier {
    pub fn new(endpoint: Url, channel: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            channel: channel.into(),
            token: token.into(),
        }
    }

    /// Sends `text` to the configured channel.
    pub async fn post(&self, text: &str) -> Result<()> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.token)
            .json(&PostMessage {
                channel: &self.channel,
                text,
            })
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", self.endpoint))?;

        let status = response.status();
        debug!(%status, channel = %self.channel, "slack responded");

        let response = response
            .error_for_status()
            .with_context(|| format!("Slack rejected message to {}", self.channel))?;

        let body = response.bytes().await.context("Failed to read Slack response")?;
        if let Ok(reply) = serde_json::from_slice::<PostMessageResponse>(&body) {
            if !reply.ok {
                anyhow::bail!(
                    "Slack rejected message to {}: {}",
                    self.channel,
                    reply.error.as_deref().unwrap_or("unknown error")
                );
            }
        }

        Ok(())
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn notify(&self, notice: &PullRequestNotice) -> Result<()> {
        self.post(&format_message(notice))
            .await
            .with_context(|| format!("Failed to send notification for {}", notice.url))
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn notice() -> PullRequestNotice {
        PullRequestNotice {
            repo: "fleet-platform".to_string(),
            author: "alice".to_string(),
            title: "Fix bug".to_string(),
            url: "https://github.com/ChargePoint/fleet-platform/pull/1".to_string(),
        }
    }

    fn notifier_for(server: &MockServer) -> SlackNotifier {
        let endpoint = Url::parse(&format!("{}/api/chat.postMessage", server.uri())).unwrap();
        SlackNotifier::new(endpoint, "C0123", "xoxb-test")
    }

    #[test]
    fn test_format_message() {
        assert_eq!(
            format_message(&notice()),
            "New pull request by *alice* in *fleet-platform*: <https://github.com/ChargePoint/fleet-platform/pull/1|*Fix bug*>"
        );
    }

    #[tokio::test]
    async fn test_notify_posts_channel_and_text_with_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat.postMessage"))
            .and(header("authorization", "Bearer xoxb-test"))
            .and(body_json(serde_json::json!({
                "channel": "C0123",
                "text": format_message(&notice()),
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        notifier_for(&server).notify(&notice()).await.unwrap();
    }

    #[tokio::test]
    async fn test_non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let err = notifier_for(&server).notify(&notice()).await.unwrap_err();
        assert!(err.to_string().contains("pull/1"));
    }

    #[tokio::test]
    async fn test_in_band_error_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({"ok": false, "error": "channel_not_found"}),
            ))
            .mount(&server)
            .await;

        let err = notifier_for(&server).post("hello").await.unwrap_err();
        assert!(err.to_string().contains("channel_not_found"));
    }

    #[tokio::test]
    async fn test_non_json_success_body_is_accepted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        notifier_for(&server).post("hello").await.unwrap();
    }
}
