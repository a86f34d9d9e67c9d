//! Owner-checked deletion
//!
//! The bucket object goes first, then the record, then the ledger is
//! credited. If the bucket delete fails nothing else is touched. If the
//! record delete fails afterwards, the record points at a missing object and
//! the ledger still counts it; the caller may retry.

use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::db::{MetadataRepository, StoredObject};
use crate::domain::ObjectKey;
use crate::storage::ObjectStore;
use super::{QuotaLedger, StoreError};

#[derive(Clone)]
pub struct DeletionController {
    repo: Arc<dyn MetadataRepository>,
    store: Arc<dyn ObjectStore>,
    ledger: QuotaLedger,
}

impl DeletionController {
    pub fn new(
        repo: Arc<dyn MetadataRepository>,
        store: Arc<dyn ObjectStore>,
        ledger: QuotaLedger,
    ) -> Self {
        Self { repo, store, ledger }
    }

    /// Delete `object_id` on behalf of `requester_id`, returning the removed record
    #[instrument(skip(self))]
    pub async fn delete(&self, requester_id: &str, object_id: Uuid) -> Result<StoredObject, StoreError> {
        let object = self
            .repo
            .find_object(object_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("file {}", object_id)))?;

        if object.owner_id != requester_id {
            return Err(StoreError::NotOwner(object_id));
        }

        let key = ObjectKey::new(&object.owner_id, object.id, &object.content_type).to_key();
        self.store.delete(&key).await?;

        match self.repo.delete_object(object.id).await {
            Ok(true) => {}
            // A concurrent delete already removed the record and credited the ledger
            Ok(false) => return Err(StoreError::NotFound(format!("file {}", object_id))),
            Err(e) => {
                error!(key = %key, error = %e, "Object removed from bucket but record remains");
                return Err(e.into());
            }
        }

        if let Err(e) = self.ledger.decrease(&object.owner_id, object.size).await {
            error!(key = %key, size = object.size, error = %e, "Object deleted but quota not credited");
            return Err(e);
        }

        info!(user_id = %requester_id, object_id = %object.id, size = object.size, "File deleted");
        Ok(object)
    }
}
