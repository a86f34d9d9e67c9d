//! Media Store
//!
//! Per-user media storage API using Rust + Actix-Web.
//! Uploads land in an S3-compatible bucket, metadata and quota usage in
//! PostgreSQL. JPEG uploads are stripped of EXIF metadata before storage.

use actix_web::{web, App, HttpServer, middleware};
use anyhow::Context;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_actix_web::TracingLogger;

mod api;
mod domain;
mod engine;
mod config;
mod db;
mod storage;

use crate::config::Settings;
use crate::db::{DbPool, InMemoryRepository, MetadataRepository, PgMetadataRepository};
use crate::engine::{EngineConfig, StorageEngine};
use crate::storage::{InMemoryObjectStore, ObjectStore, S3ObjectStore};
use crate::api::middleware::{cors_layer, IdentityMiddleware};

/// Which backends the running engine is wired to
#[derive(Debug, Clone, Copy)]
pub struct Backends {
    pub metadata: &'static str,
    pub objects: &'static str,
}

impl Backends {
    #[cfg(test)]
    pub fn in_memory() -> Self {
        Backends { metadata: "memory", objects: "memory" }
    }
}

/// Application state shared across all handlers
pub struct AppState {
    pub settings: Settings,
    pub engine: StorageEngine,
    pub backends: Backends,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing subscriber for structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("media_store=info".parse()?)
                .add_directive("actix_web=info".parse()?)
        )
        .json()
        .init();

    let settings = Settings::load().context("Failed to load configuration")?;
    let bind_addr = format!("{}:{}", settings.server.host, settings.server.port);

    info!(
        "Starting Media Store v{} on {}",
        env!("CARGO_PKG_VERSION"),
        bind_addr
    );

    let (repo, metadata): (Arc<dyn MetadataRepository>, &'static str) =
        if !settings.database.url.is_empty() {
            let pool = DbPool::new(&settings.database.url, settings.database.max_connections)
                .context("Failed to create database pool")?;
            pool.test_connection().await.context("Database connection test failed")?;
            pool.ensure_schema().await.context("Failed to create database schema")?;
            info!("Database pool initialized successfully");
            (Arc::new(PgMetadataRepository::new(pool)), "postgres")
        } else {
            warn!("No database URL configured, keeping metadata in memory");
            (Arc::new(InMemoryRepository::new()), "memory")
        };

    let (store, objects): (Arc<dyn ObjectStore>, &'static str) =
        if !settings.storage.bucket.is_empty() {
            let s3 = S3ObjectStore::new(&settings.storage)
                .await
                .context("Failed to initialize object store")?;
            info!(bucket = %s3.bucket(), "Object store initialized");
            (Arc::new(s3), "s3")
        } else {
            warn!("No bucket configured, keeping objects in memory");
            (Arc::new(InMemoryObjectStore::new()), "memory")
        };

    let engine = StorageEngine::new(EngineConfig::from(&settings), repo, store);
    info!(
        quota_bytes = settings.quota.limit_bytes,
        max_upload_bytes = settings.server.max_upload_bytes,
        "Storage engine ready"
    );

    let workers = settings.server.workers.unwrap_or_else(|| num_cpus::get() * 2);
    let max_upload_bytes = settings.server.max_upload_bytes;

    let app_state = web::Data::new(AppState {
        settings,
        engine,
        backends: Backends { metadata, objects },
    });

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .app_data(web::PayloadConfig::new(max_upload_bytes))
            // Resolves the requester before any storage handler runs
            .wrap(IdentityMiddleware::new(app_state.settings.identity.clone()))
            // Outside the identity check so preflights need no requester header
            .wrap(cors_layer(&app_state.settings.server))
            .wrap(TracingLogger::default())
            .wrap(
                middleware::DefaultHeaders::new()
                    .add(("X-Service", "media-store"))
                    .add(("X-Version", env!("CARGO_PKG_VERSION")))
            )
            .configure(api::configure_routes)
    })
    .workers(workers)
    .bind(&bind_addr)?
    .run()
    .await?;

    Ok(())
}
