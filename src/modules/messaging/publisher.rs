use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("publish request failed: {0}")]
    Transport(String),

    #[error("broker rejected message ({status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Trait for broker publish operations.
///
/// Implementations return only after the broker acknowledged the message.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, topic: &str, payload: Bytes) -> Result<(), PublishError>;
}

/// Payload announcing a freshly stored report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportCreatedEvent {
    pub report_id: Uuid,
    pub text: String,
    /// Public URL of the image, empty when the report has none
    pub image_url: String,
}

impl ReportCreatedEvent {
    pub fn new(report_id: Uuid, text: &str, image: &str, public_base_url: &str) -> Self {
        let image_url = if image.is_empty() {
            String::new()
        } else {
            format!("{}/{}", public_base_url.trim_end_matches('/'), image)
        };

        Self {
            report_id,
            text: text.to_string(),
            image_url,
        }
    }

    pub fn to_bytes(&self) -> Result<Bytes, PublishError> {
        Ok(Bytes::from(serde_json::to_vec(self)?))
    }
}

/// Publisher used when no broker is configured; acknowledges everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPublisher;

#[async_trait]
impl EventPublisher for NoopPublisher {
    async fn publish(&self, topic: &str, payload: Bytes) -> Result<(), PublishError> {
        debug!(topic, size = payload.len(), "publisher disabled, dropping event");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_escapes_text() {
        let id = Uuid::new_v4();
        let event = ReportCreatedEvent::new(id, "jalan \"rusak\"\nparah", "", "http://cdn");

        let bytes = event.to_bytes().unwrap();
        let decoded: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(decoded["report_id"], id.to_string());
        assert_eq!(decoded["text"], "jalan \"rusak\"\nparah");
        assert_eq!(decoded["image_url"], "");
    }

    #[test]
    fn test_event_builds_public_image_url() {
        let event =
            ReportCreatedEvent::new(Uuid::new_v4(), "", "reports/abc.png", "http://cdn.local/");
        assert_eq!(event.image_url, "http://cdn.local/reports/abc.png");
    }

    #[tokio::test]
    async fn test_noop_publisher_acknowledges() {
        let result = NoopPublisher
            .publish("reports", Bytes::from_static(b"{}"))
            .await;
        assert!(result.is_ok());
    }
}
