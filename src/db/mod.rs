//! Database module for PostgreSQL connectivity
//!
//! Provides connection pool management and the metadata repository that
//! tracks storage accounts and stored objects.

pub mod pool;
pub mod models;
pub mod queries;
pub mod repository;
pub mod memory;

pub use pool::{DbPool, DbError};
pub use models::{UserAccount, StoredObject, NewStoredObject};
pub use queries::PgMetadataRepository;
pub use repository::{MetadataRepository, ListWindow};
pub use memory::InMemoryRepository;
