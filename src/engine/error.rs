//! Engine error type

use thiserror::Error;
use uuid::Uuid;

use crate::db::DbError;
use crate::domain::CursorError;
use crate::storage::ObjectStoreError;

/// Every failure an engine operation can report. Each call either fully
/// succeeds or returns exactly one of these.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("quota exceeded: {used} bytes used, {requested} requested, limit is {limit}")]
    QuotaExceeded { used: i64, requested: i64, limit: i64 },

    #[error("you are not the owner of {0}")]
    NotOwner(Uuid),

    #[error("{0} not found")]
    NotFound(String),

    #[error("failed to sanitize image: {0}")]
    Decode(String),

    #[error("object store error: {0}")]
    ObjectStore(#[from] ObjectStoreError),

    #[error("metadata store error: {0}")]
    Metadata(#[from] DbError),
}

impl From<CursorError> for StoreError {
    fn from(err: CursorError) -> Self {
        StoreError::InvalidRequest(err.to_string())
    }
}

impl StoreError {
    /// HTTP status the error maps to
    pub fn status_code(&self) -> u16 {
        match self {
            StoreError::InvalidRequest(_) => 400,
            StoreError::QuotaExceeded { .. } => 403,
            StoreError::NotOwner(_) => 403,
            StoreError::NotFound(_) => 404,
            StoreError::Decode(_) => 500,
            StoreError::ObjectStore(_) => 500,
            StoreError::Metadata(_) => 500,
        }
    }

    /// Stable machine-readable code for response bodies
    pub fn error_code(&self) -> &'static str {
        match self {
            StoreError::InvalidRequest(_) => "invalid_request",
            StoreError::QuotaExceeded { .. } => "quota_exceeded",
            StoreError::NotOwner(_) => "not_owner",
            StoreError::NotFound(_) => "not_found",
            StoreError::Decode(_) => "decode_failed",
            StoreError::ObjectStore(_) => "object_store_error",
            StoreError::Metadata(_) => "metadata_store_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(StoreError::InvalidRequest("x".into()).status_code(), 400);
        assert_eq!(StoreError::QuotaExceeded { used: 1, requested: 2, limit: 2 }.status_code(), 403);
        assert_eq!(StoreError::NotOwner(Uuid::nil()).status_code(), 403);
        assert_eq!(StoreError::NotFound("file".into()).status_code(), 404);
        assert_eq!(StoreError::Decode("bad".into()).status_code(), 500);
        assert_eq!(
            StoreError::from(ObjectStoreError::UploadFailed("boom".into())).status_code(),
            500
        );
        assert_eq!(
            StoreError::from(DbError::Unavailable("down".into())).error_code(),
            "metadata_store_error"
        );
    }

    #[test]
    fn test_cursor_error_is_client_error() {
        let err: StoreError = CursorError::Invalid { param: "after", value: "x".into() }.into();
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.error_code(), "invalid_request");
    }
}
