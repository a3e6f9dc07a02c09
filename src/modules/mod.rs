//! Modules layer - Infrastructure components for external integrations
//!
//! Contains adapters for the object store and the message broker.

pub mod messaging;
pub mod storage;
