use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{ChatNotifier, DeliveryError};
use crate::config::ChatSinkConfig;

/// Slack `chat.postMessage` compatible sink.
pub struct ChatSink {
    client: reqwest::Client,
    webhook_url: String,
    token: Option<String>,
    channel: String,
}

#[derive(Serialize)]
struct PostMessage<'a> {
    channel: &'a str,
    text: &'a str,
    mrkdwn: bool,
}

/// Slack answers HTTP 200 even for rejected messages, with `ok: false`.
#[derive(Deserialize)]
struct PostMessageResponse {
    ok: bool,
}

impl ChatSink {
    pub fn new(config: &ChatSinkConfig) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            client,
            webhook_url: config.webhook_url.clone(),
            token: config.token.clone(),
            channel: config.channel.clone(),
        })
    }
}

#[async_trait]
impl ChatNotifier for ChatSink {
    async fn post_message(&self, text: &str) -> Result<(), DeliveryError> {
        let payload = PostMessage {
            channel: &self.channel,
            text,
            mrkdwn: true,
        };

        let mut request = self.client.post(&self.webhook_url).json(&payload);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        let accepted = status.is_success()
            && serde_json::from_str::<PostMessageResponse>(&body).is_ok_and(|r| r.ok);
        if !accepted {
            return Err(DeliveryError::Rejected {
                sink: self.name(),
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(channel = %self.channel, bytes = text.len(), "Chat message posted");
        Ok(())
    }
}
