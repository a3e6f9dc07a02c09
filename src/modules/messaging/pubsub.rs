//! Google Cloud Pub/Sub publisher over the REST API
//!
//! `POST {endpoint}/v1/projects/{project}/topics/{topic}:publish` with the
//! message body base64 encoded. A bearer token is attached when configured;
//! the emulator accepts unauthenticated requests.

use async_trait::async_trait;
use base64::prelude::*;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::publisher::{EventPublisher, PublishError};
use crate::core::config::PublisherConfig;

#[derive(Debug, Serialize)]
struct PublishRequest {
    messages: Vec<PubSubMessage>,
}

#[derive(Debug, Serialize)]
struct PubSubMessage {
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublishResponse {
    #[serde(default)]
    message_ids: Vec<String>,
}

pub struct PubSubPublisher {
    client: reqwest::Client,
    endpoint: String,
    project_id: String,
    access_token: Option<String>,
}

impl PubSubPublisher {
    pub fn new(config: &PublisherConfig) -> Result<Self, PublishError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PublishError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        info!(
            "Pub/Sub publisher initialized for project: {}, endpoint: {}",
            config.project_id, config.endpoint
        );

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            project_id: config.project_id.clone(),
            access_token: config.access_token.clone(),
        })
    }

    fn publish_url(&self, topic: &str) -> String {
        format!(
            "{}/v1/projects/{}/topics/{}:publish",
            self.endpoint, self.project_id, topic
        )
    }
}

#[async_trait]
impl EventPublisher for PubSubPublisher {
    async fn publish(&self, topic: &str, payload: Bytes) -> Result<(), PublishError> {
        let body = PublishRequest {
            messages: vec![PubSubMessage {
                data: BASE64_STANDARD.encode(&payload),
            }],
        };

        let mut request = self.client.post(self.publish_url(topic)).json(&body);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| PublishError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PublishError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let ack: PublishResponse = response
            .json()
            .await
            .map_err(|e| PublishError::Transport(format!("Invalid publish response: {}", e)))?;

        debug!(topic, message_ids = ?ack.message_ids, "event published");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config() -> PublisherConfig {
        PublisherConfig {
            enabled: true,
            project_id: "lapor-dev".to_string(),
            topic_id: "report-created".to_string(),
            endpoint: "http://localhost:8085/".to_string(),
            access_token: None,
            timeout: Duration::from_secs(1),
        }
    }

    #[test]
    fn test_publish_url() {
        let publisher = PubSubPublisher::new(&config()).unwrap();
        assert_eq!(
            publisher.publish_url("report-created"),
            "http://localhost:8085/v1/projects/lapor-dev/topics/report-created:publish"
        );
    }

    #[test]
    fn test_request_body_is_base64() {
        let body = PublishRequest {
            messages: vec![PubSubMessage {
                data: BASE64_STANDARD.encode(b"{\"a\":1}"),
            }],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["messages"][0]["data"], "eyJhIjoxfQ==");
    }
}
