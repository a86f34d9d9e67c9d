//! Upload admission
//!
//! Pipeline for `POST /files`:
//! 1. Find or create the uploader's account
//! 2. Strip JPEG metadata and settle the final size
//! 3. Check the quota
//! 4. Write the bytes to the object store
//! 5. Record the object
//! 6. Charge the ledger
//!
//! The quota check in step 3 is not serialized against other uploads by the
//! same user, so two concurrent uploads can both pass it and together exceed
//! the limit. The object store and the metadata store are independent: a
//! failure in step 5 or 6 leaves an uncharged object behind in the bucket.

use bytes::Bytes;
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::db::{MetadataRepository, NewStoredObject, StoredObject};
use crate::domain::{mime, ObjectKey};
use crate::storage::ObjectStore;
use super::sanitizer::{requires_sanitizing, sanitize, SanitizeOutcome};
use super::{EngineConfig, QuotaLedger, StoreError};

#[derive(Clone)]
pub struct AdmissionController {
    config: Arc<EngineConfig>,
    repo: Arc<dyn MetadataRepository>,
    store: Arc<dyn ObjectStore>,
    ledger: QuotaLedger,
}

impl AdmissionController {
    pub fn new(
        config: Arc<EngineConfig>,
        repo: Arc<dyn MetadataRepository>,
        store: Arc<dyn ObjectStore>,
        ledger: QuotaLedger,
    ) -> Self {
        Self { config, repo, store, ledger }
    }

    /// Store an upload for `requester_id` and charge it to their quota
    #[instrument(skip(self, payload), fields(size = payload.len()))]
    pub async fn admit(
        &self,
        requester_id: &str,
        payload: Bytes,
        content_type: &str,
    ) -> Result<StoredObject, StoreError> {
        let content_type = mime::normalize(content_type);

        let account = self.repo.find_or_create_account(requester_id).await?;

        let body = self.sanitized(payload, &content_type).await?;
        let size = body.len() as i64;

        let within_quota = account
            .total_bytes
            .checked_add(size)
            .is_some_and(|total| total <= self.config.quota_limit);

        if !within_quota {
            info!(
                user_id = %requester_id,
                total_bytes = account.total_bytes,
                size,
                quota = self.config.quota_limit,
                "Upload rejected: quota exceeded"
            );
            return Err(StoreError::QuotaExceeded {
                used: account.total_bytes,
                requested: size,
                limit: self.config.quota_limit,
            });
        }

        let key = ObjectKey::new(requester_id, Uuid::new_v4(), &content_type);
        let object_key = key.to_key();

        self.store
            .put(&object_key, body, &content_type, size as u64)
            .await?;

        let record = NewStoredObject {
            id: key.object_id,
            url: key.public_url(&self.config.public_base_url),
            owner_id: requester_id.to_string(),
            size,
            content_type: content_type.clone(),
        };

        let stored = match self.repo.insert_object(record).await {
            Ok(stored) => stored,
            Err(e) => {
                error!(key = %object_key, error = %e, "Object stored but not recorded; orphaned in bucket");
                return Err(e.into());
            }
        };

        if let Err(e) = self.ledger.increase(requester_id, size).await {
            error!(key = %object_key, size, error = %e, "Object recorded but not charged to quota");
            return Err(e);
        }

        info!(
            user_id = %requester_id,
            object_id = %stored.id,
            size,
            content_type = %content_type,
            "Upload stored"
        );

        Ok(stored)
    }

    /// Payload to store: stripped if it is a JPEG, otherwise untouched
    async fn sanitized(&self, payload: Bytes, content_type: &str) -> Result<Bytes, StoreError> {
        if !requires_sanitizing(content_type) {
            return Ok(payload);
        }

        let input = payload.clone();
        let declared = content_type.to_string();
        let outcome = tokio::task::spawn_blocking(move || sanitize(&input, &declared))
            .await
            .map_err(|e| StoreError::Decode(format!("sanitizer task failed: {}", e)))?;

        match outcome {
            SanitizeOutcome::Unchanged => Ok(payload),
            SanitizeOutcome::Sanitized { data, .. } => Ok(data),
            SanitizeOutcome::Failed(reason) => Err(StoreError::Decode(reason)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::{harness, PUBLIC_BASE_URL};
    use futures::future::join_all;
    use image::{DynamicImage, ImageOutputFormat, RgbImage};
    use std::io::Cursor;
    use tokio_test::{assert_err, assert_ok};

    const USER: &str = "CC1234567890abcdef1234567890abcdef12345678";

    fn jpeg_bytes() -> Bytes {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(24, 24, image::Rgb([10, 200, 30])));
        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, ImageOutputFormat::Jpeg(100)).unwrap();
        Bytes::from(buffer.into_inner())
    }

    async fn total(h: &crate::engine::testing::Harness) -> i64 {
        h.repo.find_account(USER).await.unwrap().unwrap().total_bytes
    }

    #[tokio::test]
    async fn test_upload_within_quota() {
        let h = harness(1000);
        let stored = assert_ok!(
            h.engine.admission.admit(USER, Bytes::from_static(b"hello world"), "text/plain").await
        );

        assert_eq!(stored.size, 11);
        assert_eq!(stored.owner_id, USER);
        assert_eq!(stored.content_type, "text/plain");
        assert_eq!(stored.url, format!("{}{}/{}.txt", PUBLIC_BASE_URL, USER, stored.id));
        assert_eq!(total(&h).await, 11);

        let key = format!("{}/{}.txt", USER, stored.id);
        let object = h.store.get(&key).unwrap();
        assert_eq!(object.data.as_ref(), b"hello world");
        assert_eq!(object.content_type, "text/plain");
    }

    #[tokio::test]
    async fn test_totals_accumulate_exactly() {
        let h = harness(100);
        for (i, len) in [10usize, 25, 40].into_iter().enumerate() {
            let before = if i == 0 { 0 } else { total(&h).await };
            h.engine.admission.admit(USER, Bytes::from(vec![7u8; len]), "").await.unwrap();
            assert_eq!(total(&h).await, before + len as i64);
        }
    }

    #[tokio::test]
    async fn test_upload_filling_quota_exactly_is_allowed() {
        let h = harness(10);
        assert_ok!(h.engine.admission.admit(USER, Bytes::from(vec![0u8; 10]), "").await);
        assert_eq!(total(&h).await, 10);
    }

    #[tokio::test]
    async fn test_upload_over_quota_rejected() {
        let h = harness(15);
        h.engine.admission.admit(USER, Bytes::from(vec![0u8; 10]), "").await.unwrap();

        let err = assert_err!(h.engine.admission.admit(USER, Bytes::from(vec![0u8; 6]), "").await);
        assert!(matches!(err, StoreError::QuotaExceeded { used: 10, requested: 6, limit: 15 }));
        assert_eq!(total(&h).await, 10);
        assert_eq!(h.store.keys().len(), 1);
        assert_eq!(h.repo.object_count(), 1);
    }

    #[tokio::test]
    async fn test_total_near_i64_max_is_over_quota() {
        let h = harness(i64::MAX);
        h.repo.find_or_create_account(USER).await.unwrap();
        h.repo.add_to_total(USER, i64::MAX - 2).await.unwrap();

        let err = assert_err!(h.engine.admission.admit(USER, Bytes::from_static(b"abcd"), "").await);
        assert!(matches!(err, StoreError::QuotaExceeded { requested: 4, .. }));
        assert!(h.store.keys().is_empty());
        assert_eq!(total(&h).await, i64::MAX - 2);

        assert_ok!(h.engine.admission.admit(USER, Bytes::from_static(b"ab"), "").await);
        assert_eq!(total(&h).await, i64::MAX);
    }

    #[tokio::test]
    async fn test_unknown_type_has_no_extension() {
        let h = harness(100);
        let stored = h.engine.admission.admit(USER, Bytes::from_static(b"\x00\x01"), "").await.unwrap();

        assert_eq!(stored.content_type, mime::DEFAULT_CONTENT_TYPE);
        assert_eq!(stored.url, format!("{}{}/{}", PUBLIC_BASE_URL, USER, stored.id));
        assert!(h.store.get(&format!("{}/{}", USER, stored.id)).is_some());
    }

    #[tokio::test]
    async fn test_jpeg_is_sanitized_and_charged_at_final_size() {
        let h = harness(1_000_000);
        let original = jpeg_bytes();
        let stored = h.engine.admission.admit(USER, original.clone(), "image/jpeg").await.unwrap();

        let object = h.store.get(&format!("{}/{}.jpeg", USER, stored.id)).unwrap();
        assert_eq!(object.data.len() as i64, stored.size);
        assert_eq!(total(&h).await, stored.size);
        assert_ne!(object.data, original);
    }

    #[tokio::test]
    async fn test_broken_jpeg_is_decode_error() {
        let h = harness(1000);
        let broken = Bytes::from_static(&[0xFF, 0xD8, 0xFF, 0xDB, 0x00, 0x43, 0x00]);
        let err = h.engine.admission.admit(USER, broken, "image/jpeg").await.unwrap_err();

        assert!(matches!(err, StoreError::Decode(_)));
        assert!(h.store.keys().is_empty());
        assert_eq!(total(&h).await, 0);
    }

    #[tokio::test]
    async fn test_object_store_failure_persists_nothing() {
        let h = harness(1000);
        h.store.set_fail_puts(true);

        let err = h.engine.admission.admit(USER, Bytes::from_static(b"abc"), "text/plain").await.unwrap_err();
        assert!(matches!(err, StoreError::ObjectStore(_)));
        assert_eq!(h.repo.object_count(), 0);
        assert_eq!(total(&h).await, 0);
    }

    #[tokio::test]
    async fn test_metadata_failure_leaves_uncharged_orphan() {
        let h = harness(1000);
        h.repo.set_fail_object_writes(true);

        let err = h.engine.admission.admit(USER, Bytes::from_static(b"abc"), "text/plain").await.unwrap_err();
        assert!(matches!(err, StoreError::Metadata(_)));
        assert_eq!(h.store.keys().len(), 1);
        assert_eq!(h.repo.object_count(), 0);
        assert_eq!(total(&h).await, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_uploads_share_one_account() {
        let h = harness(1_000_000);

        let uploads = (0..16).map(|i| {
            let admission = h.engine.admission.clone();
            tokio::spawn(async move {
                admission.admit(USER, Bytes::from(vec![1u8; i + 1]), "text/plain").await
            })
        });
        for result in join_all(uploads).await {
            result.unwrap().unwrap();
        }

        let expected: i64 = (1..=16).sum();
        assert_eq!(total(&h).await, expected);
        assert_eq!(h.repo.object_count(), 16);
    }
}
