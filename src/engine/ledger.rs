//! Quota ledger
//!
//! Running total of bytes each user has stored. Every mutation is a single
//! atomic add in the repository, so concurrent uploads and deletions never
//! lose updates. Reading the total and then charging it during admission is
//! still two steps; see [`AdmissionController`](super::AdmissionController).

use std::sync::Arc;
use tracing::debug;

use crate::db::{MetadataRepository, UserAccount};
use super::StoreError;

#[derive(Clone)]
pub struct QuotaLedger {
    repo: Arc<dyn MetadataRepository>,
}

impl QuotaLedger {
    pub fn new(repo: Arc<dyn MetadataRepository>) -> Self {
        Self { repo }
    }

    /// Charge `delta` bytes to the user
    pub async fn increase(&self, user_id: &str, delta: i64) -> Result<UserAccount, StoreError> {
        if delta < 0 {
            return Err(StoreError::InvalidRequest(format!("negative increase: {}", delta)));
        }
        self.apply(user_id, delta).await
    }

    /// Release `delta` bytes. The stored total is not clamped at zero.
    pub async fn decrease(&self, user_id: &str, delta: i64) -> Result<UserAccount, StoreError> {
        if delta < 0 {
            return Err(StoreError::InvalidRequest(format!("negative decrease: {}", delta)));
        }
        self.apply(user_id, -delta).await
    }

    /// The user's account as shown to clients
    pub async fn account(&self, user_id: &str) -> Result<UserAccount, StoreError> {
        self.repo
            .find_account(user_id)
            .await?
            .map(|account| account.for_display())
            .ok_or_else(|| StoreError::NotFound(format!("account {}", user_id)))
    }

    async fn apply(&self, user_id: &str, delta: i64) -> Result<UserAccount, StoreError> {
        let account = self
            .repo
            .add_to_total(user_id, delta)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("account {}", user_id)))?;

        debug!(user_id = %user_id, delta, total_bytes = account.total_bytes, "Ledger updated");
        Ok(account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryRepository;
    use futures::future::join_all;

    async fn ledger_with(user: &str) -> (Arc<InMemoryRepository>, QuotaLedger) {
        let repo = Arc::new(InMemoryRepository::new());
        repo.find_or_create_account(user).await.unwrap();
        let ledger = QuotaLedger::new(repo.clone());
        (repo, ledger)
    }

    #[tokio::test]
    async fn test_increase_and_decrease() {
        let (_repo, ledger) = ledger_with("alice").await;

        assert_eq!(ledger.increase("alice", 100).await.unwrap().total_bytes, 100);
        assert_eq!(ledger.increase("alice", 50).await.unwrap().total_bytes, 150);
        assert_eq!(ledger.decrease("alice", 30).await.unwrap().total_bytes, 120);
    }

    #[tokio::test]
    async fn test_negative_deltas_rejected() {
        let (_repo, ledger) = ledger_with("alice").await;
        assert!(matches!(ledger.increase("alice", -1).await, Err(StoreError::InvalidRequest(_))));
        assert!(matches!(ledger.decrease("alice", -1).await, Err(StoreError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_missing_account() {
        let (_repo, ledger) = ledger_with("alice").await;
        assert!(matches!(ledger.increase("bob", 1).await, Err(StoreError::NotFound(_))));
        assert!(matches!(ledger.account("bob").await, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_decrease_below_zero_is_stored_but_not_displayed() {
        let (repo, ledger) = ledger_with("alice").await;
        ledger.increase("alice", 10).await.unwrap();

        let stored = ledger.decrease("alice", 25).await.unwrap();
        assert_eq!(stored.total_bytes, -15);
        assert_eq!(repo.find_account("alice").await.unwrap().unwrap().total_bytes, -15);
        assert_eq!(ledger.account("alice").await.unwrap().total_bytes, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_updates_are_not_lost() {
        let (_repo, ledger) = ledger_with("alice").await;

        let increases = (0..200).map(|_| {
            let ledger = ledger.clone();
            tokio::spawn(async move { ledger.increase("alice", 3).await })
        });
        let decreases = (0..100).map(|_| {
            let ledger = ledger.clone();
            tokio::spawn(async move { ledger.decrease("alice", 1).await })
        });

        let results = join_all(increases.chain(decreases)).await;
        for result in results {
            result.unwrap().unwrap();
        }

        assert_eq!(ledger.account("alice").await.unwrap().total_bytes, 200 * 3 - 100);
    }
}
