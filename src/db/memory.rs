//! In-memory metadata repository
//!
//! Backs the service when no database URL is configured and drives the
//! engine tests. All state sits behind one lock, so every trait method is
//! atomic with respect to the others.

use async_trait::async_trait;
use chrono::{SubsecRound, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

use super::models::{NewStoredObject, StoredObject, UserAccount};
use super::pool::DbError;
use super::repository::{ListWindow, MetadataRepository};

#[derive(Default)]
struct Tables {
    accounts: HashMap<String, UserAccount>,
    objects: HashMap<Uuid, StoredObject>,
}

#[derive(Default)]
pub struct InMemoryRepository {
    tables: Mutex<Tables>,
    fail_object_writes: AtomicBool,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make object inserts and deletes fail until switched back
    #[cfg(test)]
    pub fn set_fail_object_writes(&self, fail: bool) {
        self.fail_object_writes.store(fail, Ordering::SeqCst);
    }

    #[cfg(test)]
    pub fn object_count(&self) -> usize {
        self.tables.lock().objects.len()
    }

    /// Insert a record with a caller-chosen creation time
    #[cfg(test)]
    pub fn seed_object(&self, object: StoredObject) {
        let mut tables = self.tables.lock();
        let now = Utc::now();
        tables.accounts.entry(object.owner_id.clone()).or_insert_with(|| UserAccount {
            id: object.owner_id.clone(),
            total_bytes: 0,
            cdate: now,
            mdate: now,
        });
        tables.objects.insert(object.id, object);
    }

    fn check_object_writes(&self) -> Result<(), DbError> {
        if self.fail_object_writes.load(Ordering::SeqCst) {
            return Err(DbError::Unavailable("object writes disabled".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl MetadataRepository for InMemoryRepository {
    async fn find_or_create_account(&self, id: &str) -> Result<UserAccount, DbError> {
        let mut tables = self.tables.lock();
        let now = Utc::now();
        let account = tables.accounts.entry(id.to_string()).or_insert_with(|| UserAccount {
            id: id.to_string(),
            total_bytes: 0,
            cdate: now,
            mdate: now,
        });
        Ok(account.clone())
    }

    async fn find_account(&self, id: &str) -> Result<Option<UserAccount>, DbError> {
        Ok(self.tables.lock().accounts.get(id).cloned())
    }

    async fn add_to_total(&self, id: &str, delta: i64) -> Result<Option<UserAccount>, DbError> {
        let mut tables = self.tables.lock();
        Ok(tables.accounts.get_mut(id).map(|account| {
            account.total_bytes += delta;
            account.mdate = Utc::now();
            account.clone()
        }))
    }

    async fn insert_object(&self, object: NewStoredObject) -> Result<StoredObject, DbError> {
        self.check_object_writes()?;
        let stored = object.into_stored(Utc::now().trunc_subsecs(0));
        self.tables.lock().objects.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn find_object(&self, id: Uuid) -> Result<Option<StoredObject>, DbError> {
        Ok(self.tables.lock().objects.get(&id).cloned())
    }

    async fn delete_object(&self, id: Uuid) -> Result<bool, DbError> {
        self.check_object_writes()?;
        Ok(self.tables.lock().objects.remove(&id).is_some())
    }

    async fn list_objects(
        &self,
        owner_id: &str,
        window: ListWindow,
        limit: i64,
    ) -> Result<Vec<StoredObject>, DbError> {
        let tables = self.tables.lock();
        let mut rows: Vec<StoredObject> = tables
            .objects
            .values()
            .filter(|o| o.owner_id == owner_id)
            .filter(|o| match window {
                ListWindow::Latest => true,
                ListWindow::Since(bound) => o.cdate >= bound,
                ListWindow::Before(bound) => o.cdate < bound,
            })
            .cloned()
            .collect();

        match window {
            ListWindow::Since(_) => rows.sort_by(|a, b| (a.cdate, a.id).cmp(&(b.cdate, b.id))),
            _ => rows.sort_by(|a, b| (b.cdate, b.id).cmp(&(a.cdate, a.id))),
        }
        rows.truncate(limit.max(0) as usize);

        Ok(rows)
    }
}
