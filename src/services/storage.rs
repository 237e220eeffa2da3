use s3::creds::Credentials;
use s3::{Bucket, Region};
use std::time::Duration;
use tokio::time::sleep;

/// Upload attempts per photo before the failure is surfaced.
const UPLOAD_ATTEMPTS: u32 = 3;

/// Initial backoff between attempts; doubles after each failure.
const UPLOAD_BACKOFF_MS: u64 = 250;

/// Client for the S3-compatible bucket holding diagnostic photos.
pub struct StorageClient {
    bucket: Box<Bucket>,
    public_base_url: String,
}

impl StorageClient {
    pub fn new(
        bucket_name: &str,
        endpoint: &str,
        access_key: &str,
        secret_key: &str,
        public_base_url: &str,
    ) -> Result<Self, StorageError> {
        let region = Region::Custom {
            region: "auto".to_string(),
            endpoint: endpoint.to_string(),
        };

        let credentials = Credentials::new(Some(access_key), Some(secret_key), None, None, None)
            .map_err(|e| StorageError::Config(e.to_string()))?;

        let bucket = Bucket::new(bucket_name, region, credentials)
            .map_err(|e| StorageError::Config(e.to_string()))?;

        Ok(Self {
            bucket,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Upload photo bytes under the given key.
    pub async fn upload(
        &self,
        key: &str,
        data: &[u8],
        content_type: &str,
    ) -> Result<(), StorageError> {
        self.bucket
            .put_object_with_content_type(key, data, content_type)
            .await
            .map_err(StorageError::S3)?;
        Ok(())
    }

    /// Upload with retry. Transient faults are retried with a doubling
    /// backoff; the last error is returned once attempts are exhausted.
    pub async fn upload_with_retry(
        &self,
        key: &str,
        data: &[u8],
        content_type: &str,
    ) -> Result<(), StorageError> {
        let mut backoff = UPLOAD_BACKOFF_MS;
        let mut last_err = None;

        for attempt in 1..=UPLOAD_ATTEMPTS {
            match self.upload(key, data, content_type).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::warn!(key, attempt, error = %e, "photo upload attempt failed");
                    last_err = Some(e);
                    if attempt < UPLOAD_ATTEMPTS {
                        sleep(Duration::from_millis(backoff)).await;
                        backoff *= 2;
                    }
                }
            }
        }

        Err(last_err.unwrap_or_else(|| StorageError::Config("no upload attempt made".into())))
    }

    /// Cheap reachability probe against the bucket, for health reporting.
    pub async fn check(&self) -> Result<(), StorageError> {
        self.bucket
            .list_page(String::new(), None, None, None, Some(1))
            .await
            .map_err(StorageError::S3)?;
        Ok(())
    }

    /// Public URL for a stored object, derived immediately after upload.
    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, key)
    }

    /// Delete an object (test cleanup only; submitted photos are never
    /// removed by the service).
    pub async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.bucket.delete_object(key).await.map_err(StorageError::S3)?;
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("S3 operation failed: {0}")]
    S3(#[from] s3::error::S3Error),

    #[error("Storage configuration error: {0}")]
    Config(String),
}
