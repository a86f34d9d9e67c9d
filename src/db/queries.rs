//! PostgreSQL metadata repository

use async_trait::async_trait;
use tracing::{debug, info};
use uuid::Uuid;

use super::models::{NewStoredObject, StoredObject, UserAccount};
use super::pool::{DbPool, DbError};
use super::repository::{ListWindow, MetadataRepository};

/// Repository for storage account and object records
#[derive(Clone)]
pub struct PgMetadataRepository {
    pool: DbPool,
}

impl PgMetadataRepository {
    /// Create a new metadata repository
    pub fn new(pool: DbPool) -> Self {
        PgMetadataRepository { pool }
    }
}

#[async_trait]
impl MetadataRepository for PgMetadataRepository {
    async fn find_or_create_account(&self, id: &str) -> Result<UserAccount, DbError> {
        let client = self.pool.get().await?;

        let inserted = client.execute(
            "INSERT INTO storage_users (id) VALUES ($1) ON CONFLICT (id) DO NOTHING",
            &[&id]
        ).await?;

        if inserted > 0 {
            info!(user_id = %id, "Storage account created");
        }

        let row = client.query_one(
            "SELECT id, total_bytes, cdate, mdate FROM storage_users WHERE id = $1",
            &[&id]
        ).await?;

        Ok(UserAccount::from_row(&row))
    }

    async fn find_account(&self, id: &str) -> Result<Option<UserAccount>, DbError> {
        let client = self.pool.get().await?;

        let row = client.query_opt(
            "SELECT id, total_bytes, cdate, mdate FROM storage_users WHERE id = $1",
            &[&id]
        ).await?;

        Ok(row.map(|r| UserAccount::from_row(&r)))
    }

    async fn add_to_total(&self, id: &str, delta: i64) -> Result<Option<UserAccount>, DbError> {
        let client = self.pool.get().await?;

        // Single statement so concurrent adjustments never overwrite each other
        let row = client.query_opt(
            r#"
            UPDATE storage_users
            SET total_bytes = total_bytes + $2, mdate = NOW()
            WHERE id = $1
            RETURNING id, total_bytes, cdate, mdate
            "#,
            &[&id, &delta]
        ).await?;

        Ok(row.map(|r| UserAccount::from_row(&r)))
    }

    async fn insert_object(&self, object: NewStoredObject) -> Result<StoredObject, DbError> {
        let client = self.pool.get().await?;

        let row = client.query_one(
            r#"
            INSERT INTO storage_files (id, url, owner_id, size, content_type, cdate)
            VALUES ($1, $2, $3, $4, $5, date_trunc('second', NOW()))
            RETURNING id, url, owner_id, size, content_type, cdate
            "#,
            &[&object.id, &object.url, &object.owner_id, &object.size, &object.content_type]
        ).await?;

        Ok(StoredObject::from_row(&row))
    }

    async fn find_object(&self, id: Uuid) -> Result<Option<StoredObject>, DbError> {
        let client = self.pool.get().await?;

        let row = client.query_opt(
            r#"
            SELECT id, url, owner_id, size, content_type, cdate
            FROM storage_files
            WHERE id = $1
            "#,
            &[&id]
        ).await?;

        Ok(row.map(|r| StoredObject::from_row(&r)))
    }

    async fn delete_object(&self, id: Uuid) -> Result<bool, DbError> {
        let client = self.pool.get().await?;

        let deleted = client.execute(
            "DELETE FROM storage_files WHERE id = $1",
            &[&id]
        ).await?;

        Ok(deleted > 0)
    }

    async fn list_objects(
        &self,
        owner_id: &str,
        window: ListWindow,
        limit: i64,
    ) -> Result<Vec<StoredObject>, DbError> {
        let client = self.pool.get().await?;

        let rows = match window {
            ListWindow::Latest => client.query(
                r#"
                SELECT id, url, owner_id, size, content_type, cdate
                FROM storage_files
                WHERE owner_id = $1
                ORDER BY cdate DESC, id DESC
                LIMIT $2
                "#,
                &[&owner_id, &limit]
            ).await?,
            ListWindow::Since(bound) => client.query(
                r#"
                SELECT id, url, owner_id, size, content_type, cdate
                FROM storage_files
                WHERE owner_id = $1 AND cdate >= $2
                ORDER BY cdate ASC, id ASC
                LIMIT $3
                "#,
                &[&owner_id, &bound, &limit]
            ).await?,
            ListWindow::Before(bound) => client.query(
                r#"
                SELECT id, url, owner_id, size, content_type, cdate
                FROM storage_files
                WHERE owner_id = $1 AND cdate < $2
                ORDER BY cdate DESC, id DESC
                LIMIT $3
                "#,
                &[&owner_id, &bound, &limit]
            ).await?,
        };

        debug!(owner_id = %owner_id, window = ?window, rows = rows.len(), "Listed stored objects");

        Ok(rows.iter().map(StoredObject::from_row).collect())
    }
}
