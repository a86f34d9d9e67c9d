//! Object storage for uploaded bytes
//!
//! The engine writes through the [`ObjectStore`] trait. Production uses an
//! S3-compatible bucket; the in-memory store serves development and tests.

mod s3;
mod memory;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

pub use s3::S3ObjectStore;
pub use memory::InMemoryObjectStore;

/// Errors that can occur during object store operations
#[derive(Error, Debug)]
pub enum ObjectStoreError {
    #[error("Object store not configured")]
    NotConfigured,

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write `data` under `key`
    async fn put(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
        content_length: u64,
    ) -> Result<(), ObjectStoreError>;

    /// Remove the object at `key`
    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError>;
}
