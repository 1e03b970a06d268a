use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{ChannelError, ChatChannel, OutboundMessage};
use crate::config;

/// REST client for the hosted chat platform
pub struct HttpChannel {
    client: Client,
    base_url: String,
    app_id: String,
    api_key: Option<SecretString>,
    agent_uid: String,
    user_uid: String,
    retries: u32,
    backoff: Duration,
}

impl HttpChannel {
    /// Create a channel from configuration; fails when no base URL is set
    pub fn new(config: config::Channel) -> Result<Self, ChannelError> {
        let base_url = config
            .base_url
            .map(|url| url.trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .ok_or_else(|| ChannelError::NotConfigured("channel.base_url is not set".to_string()))?;

        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("listing-sync/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url,
            app_id: config.app_id,
            api_key: config.api_key,
            agent_uid: config.agent_uid,
            user_uid: config.user_uid,
            retries: config.retries,
            backoff: config.backoff,
        })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request
            .header("appid", &self.app_id)
            .header("onBehalfOf", &self.user_uid);
        match &self.api_key {
            Some(key) => request.header("apikey", key.expose_secret()),
            None => request,
        }
    }

    /// Message body in the platform's text message shape
    pub fn message_body(&self, message: &OutboundMessage) -> Value {
        json!({
            "receiver": self.agent_uid,
            "receiverType": "user",
            "category": "message",
            "type": "text",
            "data": {
                "text": message.text,
                "metadata": message.metadata,
            },
            "sentAt": Utc::now().to_rfc3339(),
        })
    }

    async fn check(request: RequestBuilder) -> Result<(), ChannelError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        warn!("Chat platform returned status: {}", status);
        Err(ChannelError::Rejected {
            status: status.as_u16(),
            body,
        })
    }

    /// Run `attempt` until it succeeds, fails permanently or retries run out
    async fn with_retry<F, Fut>(&self, what: &str, mut attempt: F) -> Result<(), ChannelError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<(), ChannelError>>,
    {
        let mut delay = self.backoff;
        let mut tries = 0;
        loop {
            tries += 1;
            match attempt().await {
                Ok(()) => return Ok(()),
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) if tries > self.retries => {
                    return Err(ChannelError::Exhausted {
                        attempts: tries,
                        last: e.to_string(),
                    })
                }
                Err(e) => {
                    warn!("{} failed (attempt {}): {}; retrying in {:?}", what, tries, e, delay);
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
            }
        }
    }
}

#[async_trait]
impl ChatChannel for HttpChannel {
    async fn connect(&self) -> Result<(), ChannelError> {
        let url = format!("{}/users/{}", self.base_url, self.agent_uid);
        self.with_retry("Connect", || Self::check(self.authorized(self.client.get(&url))))
            .await?;
        info!("Connected to chat platform at {}", self.base_url);
        Ok(())
    }

    async fn send(&self, message: &OutboundMessage) -> Result<(), ChannelError> {
        let url = format!("{}/messages", self.base_url);
        let body = self.message_body(message);
        debug!("Sending message with {} metadata keys", message.metadata.len());
        self.with_retry("Send", || Self::check(self.authorized(self.client.post(&url)).json(&body)))
            .await
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn config(base_url: Option<&str>) -> config::Channel {
        config::Channel {
            base_url: base_url.map(str::to_string),
            retries: 1,
            backoff: Duration::from_millis(1),
            timeout: Duration::from_millis(500),
            ..config::Channel::default()
        }
    }

    #[test]
    fn requires_base_url() {
        assert!(matches!(HttpChannel::new(config(None)), Err(ChannelError::NotConfigured(_))));
        assert!(matches!(HttpChannel::new(config(Some(""))), Err(ChannelError::NotConfigured(_))));
    }

    #[test]
    fn body_carries_text_metadata_and_timestamp() {
        let channel = HttpChannel::new(config(Some("https://chat.example.com/v3/"))).unwrap();
        let mut metadata = Map::new();
        metadata.insert("zpid".to_string(), json!("49023318"));
        let body = channel.message_body(&OutboundMessage {
            text: "is it still available?".to_string(),
            metadata,
        });

        assert_eq!(channel.base_url, "https://chat.example.com/v3");
        assert_eq!(body["receiver"], json!("listing-agent"));
        assert_eq!(body["data"]["text"], json!("is it still available?"));
        assert_eq!(body["data"]["metadata"]["zpid"], json!("49023318"));
        assert!(body["sentAt"].as_str().is_some_and(|s| s.contains('T')));
    }

    #[tokio::test]
    async fn unreachable_platform_exhausts_retries() {
        let channel = HttpChannel::new(config(Some("http://127.0.0.1:9"))).unwrap();
        match channel.connect().await {
            Err(ChannelError::Exhausted { attempts, .. }) => assert_eq!(attempts, 2),
            other => panic!("expected exhausted retries, got {:?}", other.err()),
        }
    }
}
