//! Metadata repository contract
//!
//! The engine only talks to metadata through this trait, so the PostgreSQL
//! implementation and the in-memory one are interchangeable.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::models::{NewStoredObject, StoredObject, UserAccount};
use super::pool::DbError;

/// Creation-time window of an owner listing. The window decides the order:
/// `Latest` and `Before` read newest first, `Since` reads oldest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListWindow {
    Latest,
    /// Created at or after the bound
    Since(DateTime<Utc>),
    /// Created strictly before the bound
    Before(DateTime<Utc>),
}

#[async_trait]
pub trait MetadataRepository: Send + Sync {
    /// Return the account, inserting an empty one if missing. Concurrent
    /// callers for the same id observe a single account.
    async fn find_or_create_account(&self, id: &str) -> Result<UserAccount, DbError>;

    async fn find_account(&self, id: &str) -> Result<Option<UserAccount>, DbError>;

    /// Atomically add `delta` (which may be negative) to the account total.
    /// Returns `None` if the account does not exist.
    async fn add_to_total(&self, id: &str, delta: i64) -> Result<Option<UserAccount>, DbError>;

    async fn insert_object(&self, object: NewStoredObject) -> Result<StoredObject, DbError>;

    async fn find_object(&self, id: Uuid) -> Result<Option<StoredObject>, DbError>;

    /// Returns whether a record was removed
    async fn delete_object(&self, id: Uuid) -> Result<bool, DbError>;

    /// Objects of `owner_id` inside `window`, at most `limit` rows
    async fn list_objects(
        &self,
        owner_id: &str,
        window: ListWindow,
        limit: i64,
    ) -> Result<Vec<StoredObject>, DbError>;
}
