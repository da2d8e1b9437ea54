//! services/api/src/adapters/media.rs
//!
//! S3-compatible implementation of the `MediaStorage` port (MinIO in
//! development). Objects are addressed path-style under the configured bucket.

use async_trait::async_trait;
use s3::creds::Credentials;
use s3::{Bucket, Region};
use shop_core::ports::{MediaStorage, PortError, PortResult};

use crate::config::MediaConfig;

pub struct S3MediaStorage {
    bucket: Box<Bucket>,
    bucket_name: String,
    public_url: String,
}

impl S3MediaStorage {
    pub fn new(config: &MediaConfig) -> Result<Self, PortError> {
        let region = Region::Custom {
            region: config.region.clone(),
            endpoint: config.endpoint.clone(),
        };
        let credentials = Credentials::new(
            Some(&config.access_key),
            Some(&config.secret_key),
            None,
            None,
            None,
        )
        .map_err(|e| PortError::Unexpected(format!("object store credentials: {}", e)))?;
        let bucket = Bucket::new(&config.bucket, region, credentials)
            .map_err(|e| PortError::Unexpected(format!("object store bucket: {}", e)))?
            .with_path_style();

        Ok(Self {
            bucket,
            bucket_name: config.bucket.clone(),
            public_url: config.public_url.clone(),
        })
    }
}

/// Public URL of an object: `<public_url>/<bucket>/<key>`.
pub(crate) fn object_url(public_url: &str, bucket: &str, key: &str) -> String {
    format!(
        "{}/{}/{}",
        public_url.trim_end_matches('/'),
        bucket,
        key.trim_start_matches('/')
    )
}

#[async_trait]
impl MediaStorage for S3MediaStorage {
    #[tracing::instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn put_object(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> PortResult<String> {
        self.bucket
            .put_object_with_content_type(key, &bytes, content_type)
            .await
            .map_err(|e| PortError::Unexpected(format!("object upload failed: {}", e)))?;
        Ok(object_url(&self.public_url, &self.bucket_name, key))
    }
}
