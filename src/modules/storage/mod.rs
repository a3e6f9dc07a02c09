//! Storage module for report images
//!
//! `FileStorage` abstracts where uploaded images live. The local backend
//! writes under a directory; the MinIO backend targets any S3-compatible store.

mod local;
mod minio_client;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

pub use local::LocalFileStorage;
pub use minio_client::MinIOStorage;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid storage path: {0}")]
    InvalidPath(String),

    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("object store error: {0}")]
    ObjectStore(String),
}

/// Trait for storing and removing uploaded files by relative path.
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Write `data` at `path`, replacing any existing object.
    async fn store(&self, path: &str, data: Bytes, content_type: &str) -> Result<(), StorageError>;

    /// Remove the object at `path`. Missing objects are not an error.
    async fn delete(&self, path: &str) -> Result<(), StorageError>;
}

/// Reject absolute paths and parent-directory segments.
pub(crate) fn validate_relative_path(path: &str) -> Result<(), StorageError> {
    let invalid = path.is_empty()
        || path.starts_with('/')
        || path.contains('\\')
        || path.split('/').any(|segment| segment.is_empty() || segment == "..");

    if invalid {
        return Err(StorageError::InvalidPath(path.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_path_validation() {
        assert!(validate_relative_path("reports/abc.png").is_ok());
        assert!(validate_relative_path("").is_err());
        assert!(validate_relative_path("/etc/passwd").is_err());
        assert!(validate_relative_path("reports/../../secret").is_err());
        assert!(validate_relative_path("reports//a.png").is_err());
    }
}
