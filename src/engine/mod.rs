//! Storage engine
//!
//! This module contains the core storage logic including:
//! - Metadata stripping for uploaded JPEGs
//! - Upload admission against the per-user quota
//! - The quota ledger
//! - Keyset pagination over an owner's objects
//! - Owner-checked deletion

mod error;
mod sanitizer;
mod admission;
mod ledger;
mod listing;
mod deletion;

use std::sync::Arc;

use crate::config::Settings;
use crate::db::MetadataRepository;
use crate::storage::ObjectStore;

pub use error::StoreError;
pub use admission::AdmissionController;
pub use ledger::QuotaLedger;
pub use listing::ListingEngine;
pub use deletion::DeletionController;

/// Immutable settings shared by every engine component
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum bytes a single user may have stored
    pub quota_limit: i64,
    /// Prefix of public object URLs
    pub public_base_url: String,
}

impl From<&Settings> for EngineConfig {
    fn from(settings: &Settings) -> Self {
        EngineConfig {
            quota_limit: settings.quota.limit_bytes,
            public_base_url: settings.storage.public_base_url.clone(),
        }
    }
}

/// All engine components wired to the same collaborators
#[derive(Clone)]
pub struct StorageEngine {
    pub admission: AdmissionController,
    pub listing: ListingEngine,
    pub deletion: DeletionController,
    pub ledger: QuotaLedger,
}

impl StorageEngine {
    pub fn new(
        config: EngineConfig,
        repo: Arc<dyn MetadataRepository>,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        let config = Arc::new(config);
        let ledger = QuotaLedger::new(repo.clone());

        StorageEngine {
            admission: AdmissionController::new(config, repo.clone(), store.clone(), ledger.clone()),
            listing: ListingEngine::new(repo.clone()),
            deletion: DeletionController::new(repo, store, ledger.clone()),
            ledger,
        }
    }
}
