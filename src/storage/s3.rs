//! S3-compatible object store client
//!
//! Works against AWS S3, Cloudflare R2, MinIO and friends. The endpoint,
//! region, static credentials and addressing style all come from
//! [`StorageSettings`].

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::{
    Client as S3Client,
    config::{Credentials, Region},
    primitives::ByteStream,
};
use bytes::Bytes;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use tracing::{debug, info, instrument, warn};

use crate::config::StorageSettings;
use super::{ObjectStore, ObjectStoreError};

/// Characters escaped when logging object URLs; `/` is kept as a separator
const PATH: &AsciiSet = &CONTROLS.add(b' ').add(b'"').add(b'#').add(b'<').add(b'>').add(b'?').add(b'`').add(b'{').add(b'}');

/// Bucket-backed object store
#[derive(Clone)]
pub struct S3ObjectStore {
    client: S3Client,
    bucket: String,
    public_base_url: String,
}

impl S3ObjectStore {
    /// Create a new client from settings
    pub async fn new(settings: &StorageSettings) -> Result<Self, ObjectStoreError> {
        if settings.bucket.is_empty() {
            return Err(ObjectStoreError::NotConfigured);
        }

        let credentials = Credentials::new(
            &settings.access_key_id,
            &settings.access_key_secret,
            None, // session token
            None, // expiry
            "media-store-static-credentials",
        );

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(settings.region.clone()))
            .credentials_provider(credentials);

        if let Some(ref endpoint) = settings.endpoint_url {
            debug!("Using custom S3 endpoint: {}", endpoint);
            loader = loader.endpoint_url(endpoint);
        }

        let shared = loader.load().await;
        let config = aws_sdk_s3::config::Builder::from(&shared)
            .force_path_style(settings.force_path_style)
            .build();

        info!(
            bucket = %settings.bucket,
            region = %settings.region,
            force_path_style = settings.force_path_style,
            "S3 object store configured"
        );

        Ok(Self {
            client: S3Client::from_conf(config),
            bucket: settings.bucket.clone(),
            public_base_url: settings.public_base_url.clone(),
        })
    }

    /// Get the bucket name
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}{}", self.public_base_url, utf8_percent_encode(key, PATH))
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    #[instrument(skip(self, data), fields(bucket = %self.bucket, size = content_length))]
    async fn put(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
        content_length: u64,
    ) -> Result<(), ObjectStoreError> {
        debug!("Uploading {} bytes to S3: {}", content_length, key);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .content_length(content_length as i64)
            .send()
            .await
            .map_err(|e| {
                warn!(key = %key, error = ?e, "S3 upload failed");
                ObjectStoreError::UploadFailed(format!("{:?}", e))
            })?;

        info!("Uploaded to: {}", self.public_url(key));
        Ok(())
    }

    #[instrument(skip(self), fields(bucket = %self.bucket))]
    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError> {
        debug!("Deleting from S3: {}", key);

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                warn!(key = %key, error = ?e, "S3 delete failed");
                ObjectStoreError::DeleteFailed(format!("{:?}", e))
            })?;

        info!("Deleted from S3: {}", key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;

    #[tokio::test]
    async fn test_requires_bucket() {
        let settings = Settings::default().storage;
        let result = S3ObjectStore::new(&settings).await;
        assert!(matches!(result, Err(ObjectStoreError::NotConfigured)));
    }

    #[tokio::test]
    async fn test_public_url_escapes_key() {
        let mut settings = Settings::default().storage;
        settings.bucket = "media".to_string();
        settings.endpoint_url = Some("http://localhost:9000".to_string());
        settings.public_base_url = "https://cdn.example.com/".to_string();

        let store = S3ObjectStore::new(&settings).await.unwrap();
        assert_eq!(store.bucket(), "media");
        assert_eq!(
            store.public_url("user one/abc.png"),
            "https://cdn.example.com/user%20one/abc.png"
        );
    }
}
