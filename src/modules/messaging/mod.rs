//! Messaging module for downstream notifications
//!
//! Report-created events go out through the `EventPublisher` trait so the
//! broker can be swapped (Google Cloud Pub/Sub in production, no-op locally).

mod publisher;
mod pubsub;

pub use publisher::{EventPublisher, NoopPublisher, PublishError, ReportCreatedEvent};
pub use pubsub::PubSubPublisher;
