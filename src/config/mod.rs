//! Configuration module for the media store

use serde::Deserialize;
use config::{Config, ConfigError, Environment, File};
use std::path::PathBuf;

/// Main application settings
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub storage: StorageSettings,
    pub quota: QuotaSettings,
    pub database: DatabaseSettings,
    pub identity: IdentitySettings,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
    /// Largest request body accepted by `POST /files`
    pub max_upload_bytes: usize,
    /// Browser origins allowed by CORS; empty allows any origin
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,
}

/// S3-compatible bucket the uploaded bytes are written to
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// Empty bucket name runs the service against an in-memory store
    pub bucket: String,
    pub region: String,
    pub endpoint_url: Option<String>,
    pub access_key_id: String,
    pub access_key_secret: String,
    /// Prefix prepended to `{owner}/{id}{ext}` to build public URLs
    pub public_base_url: String,
    #[serde(default)]
    pub force_path_style: bool,
}

/// Per-user storage quota
#[derive(Debug, Clone, Deserialize)]
pub struct QuotaSettings {
    pub limit_bytes: i64,
}

/// Database configuration for PostgreSQL
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: Option<usize>,
}

/// Gateway-propagated identity
#[derive(Debug, Clone, Deserialize)]
pub struct IdentitySettings {
    /// Header carrying the already-authenticated requester id
    pub header: String,
    /// Expected length of a requester id
    pub id_length: usize,
}

impl Settings {
    /// Load configuration from files and environment variables
    ///
    /// Configuration priority (highest to lowest):
    /// 1. Environment variables (prefixed with MEDIA_STORE_)
    /// 2. config/local.toml (gitignored)
    /// 3. config/default.toml
    pub fn load() -> Result<Self, ConfigError> {
        let config_dir = std::env::var("CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config"));

        let defaults = Settings::default();

        let builder = Config::builder()
            .set_default("server.host", defaults.server.host)?
            .set_default("server.port", defaults.server.port as i64)?
            .set_default("server.max_upload_bytes", defaults.server.max_upload_bytes as i64)?
            .set_default("storage.bucket", defaults.storage.bucket)?
            .set_default("storage.region", defaults.storage.region)?
            .set_default("storage.access_key_id", defaults.storage.access_key_id)?
            .set_default("storage.access_key_secret", defaults.storage.access_key_secret)?
            .set_default("storage.public_base_url", defaults.storage.public_base_url)?
            .set_default("quota.limit_bytes", defaults.quota.limit_bytes)?
            .set_default("database.url", defaults.database.url)?
            .set_default("identity.header", defaults.identity.header)?
            .set_default("identity.id_length", defaults.identity.id_length as i64)?
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            // MEDIA_STORE_QUOTA__LIMIT_BYTES, MEDIA_STORE_STORAGE__BUCKET, etc.
            .add_source(
                Environment::with_prefix("MEDIA_STORE")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("server.cors_allowed_origins")
            );

        builder.build()?.try_deserialize()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            server: ServerSettings {
                host: "0.0.0.0".to_string(),
                port: 8000,
                workers: None,
                max_upload_bytes: 32 * 1024 * 1024,
                cors_allowed_origins: Vec::new(),
            },
            storage: StorageSettings {
                bucket: String::new(),
                region: "auto".to_string(),
                endpoint_url: None,
                access_key_id: String::new(),
                access_key_secret: String::new(),
                public_base_url: "http://localhost:8000/media/".to_string(),
                force_path_style: false,
            },
            quota: QuotaSettings {
                limit_bytes: 100 * 1024 * 1024,
            },
            database: DatabaseSettings {
                url: String::new(),
                max_connections: Some(10),
            },
            identity: IdentitySettings {
                header: "requester-id".to_string(),
                id_length: 42,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 8000);
        assert_eq!(settings.identity.id_length, 42);
        assert!(settings.quota.limit_bytes > 0);
        assert!(settings.database.url.is_empty());
    }

    #[test]
    fn test_load_without_files_uses_defaults() {
        std::env::set_var("CONFIG_PATH", "/nonexistent-media-store-config");
        let settings = Settings::load().unwrap();
        assert_eq!(settings.identity.header, "requester-id");
        assert_eq!(settings.storage.region, "auto");
        assert!(!settings.storage.force_path_style);
        assert!(settings.server.cors_allowed_origins.is_empty());
    }
}
