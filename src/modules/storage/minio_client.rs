//! MinIO/S3-compatible storage backend
//!
//! Uses rust-s3 with path-style addressing (http://endpoint/bucket/key).

use async_trait::async_trait;
use bytes::Bytes;
use s3::creds::Credentials;
use s3::{Bucket, BucketConfiguration, Region};
use tracing::{debug, info, warn};

use super::{validate_relative_path, FileStorage, StorageError};
use crate::core::config::MinIOConfig;

pub struct MinIOStorage {
    bucket: Box<Bucket>,
    region: Region,
    credentials: Credentials,
}

impl MinIOStorage {
    /// Create the storage client and make sure the bucket exists
    pub async fn new(config: &MinIOConfig) -> Result<Self, StorageError> {
        let credentials = Credentials::new(
            Some(&config.access_key),
            Some(&config.secret_key),
            None,
            None,
            None,
        )
        .map_err(|e| StorageError::ObjectStore(format!("Failed to create credentials: {}", e)))?;

        let region = Region::Custom {
            region: config.region.clone(),
            endpoint: config.endpoint.clone(),
        };

        let mut bucket = Bucket::new(&config.bucket, region.clone(), credentials.clone())
            .map_err(|e| StorageError::ObjectStore(format!("Failed to open bucket: {}", e)))?;
        bucket.set_path_style();

        let storage = Self {
            bucket,
            region,
            credentials,
        };
        storage.ensure_bucket_exists().await;

        info!(
            "MinIO storage initialized for endpoint: {}, bucket: {}",
            config.endpoint,
            storage.bucket.name()
        );

        Ok(storage)
    }

    async fn ensure_bucket_exists(&self) {
        let result = Bucket::create_with_path_style(
            &self.bucket.name(),
            self.region.clone(),
            self.credentials.clone(),
            BucketConfiguration::default(),
        )
        .await;

        match result {
            Ok(_) => info!("Bucket '{}' created", self.bucket.name()),
            Err(e) => {
                let error_str = e.to_string();
                if error_str.contains("BucketAlreadyOwnedByYou")
                    || error_str.contains("BucketAlreadyExists")
                {
                    debug!("Bucket '{}' already exists", self.bucket.name());
                } else {
                    warn!(
                        "Could not create bucket '{}': {}. Assuming it exists.",
                        self.bucket.name(),
                        e
                    );
                }
            }
        }
    }
}

#[async_trait]
impl FileStorage for MinIOStorage {
    async fn store(&self, path: &str, data: Bytes, content_type: &str) -> Result<(), StorageError> {
        validate_relative_path(path)?;

        let response = self
            .bucket
            .put_object_with_content_type(path, &data, content_type)
            .await
            .map_err(|e| StorageError::ObjectStore(format!("Failed to upload '{}': {}", path, e)))?;

        if !(200..300).contains(&response.status_code()) {
            return Err(StorageError::ObjectStore(format!(
                "Upload of '{}' returned status {}",
                path,
                response.status_code()
            )));
        }

        debug!("Uploaded '{}' to bucket '{}'", path, self.bucket.name());
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        validate_relative_path(path)?;

        self.bucket
            .delete_object(path)
            .await
            .map_err(|e| StorageError::ObjectStore(format!("Failed to delete '{}': {}", path, e)))?;

        debug!("Deleted '{}' from bucket '{}'", path, self.bucket.name());
        Ok(())
    }
}
