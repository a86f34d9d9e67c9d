//! Database models for storage accounts and stored objects

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_postgres::Row;
use utoipa::ToSchema;
use uuid::Uuid;

/// Per-user storage account, created on first upload
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserAccount {
    pub id: String,
    /// Bytes currently charged against the quota
    pub total_bytes: i64,
    pub cdate: DateTime<Utc>,
    pub mdate: DateTime<Utc>,
}

impl UserAccount {
    pub fn from_row(row: &Row) -> Self {
        UserAccount {
            id: row.get("id"),
            total_bytes: row.get("total_bytes"),
            cdate: row.get("cdate"),
            mdate: row.get("mdate"),
        }
    }

    /// Copy of the account safe to show clients. The stored total may go
    /// negative after unbalanced decrements; what we report never does.
    pub fn for_display(&self) -> Self {
        UserAccount {
            total_bytes: self.total_bytes.max(0),
            ..self.clone()
        }
    }
}

/// Metadata record of an object written to the bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StoredObject {
    pub id: Uuid,
    pub url: String,
    pub owner_id: String,
    pub size: i64,
    pub content_type: String,
    pub cdate: DateTime<Utc>,
}

impl StoredObject {
    pub fn from_row(row: &Row) -> Self {
        StoredObject {
            id: row.get("id"),
            url: row.get("url"),
            owner_id: row.get("owner_id"),
            size: row.get("size"),
            content_type: row.get("content_type"),
            cdate: row.get("cdate"),
        }
    }
}

/// Object record before the repository assigns its creation time
#[derive(Debug, Clone)]
pub struct NewStoredObject {
    pub id: Uuid,
    pub url: String,
    pub owner_id: String,
    pub size: i64,
    pub content_type: String,
}

impl NewStoredObject {
    pub fn into_stored(self, cdate: DateTime<Utc>) -> StoredObject {
        StoredObject {
            id: self.id,
            url: self.url,
            owner_id: self.owner_id,
            size: self.size,
            content_type: self.content_type,
            cdate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_json_shape() {
        let account = UserAccount {
            id: "u".to_string(),
            total_bytes: 12,
            cdate: Utc::now(),
            mdate: Utc::now(),
        };
        let value = serde_json::to_value(&account).unwrap();
        assert_eq!(value["totalBytes"], 12);
        assert!(value.get("cdate").is_some());
        assert!(value.get("mdate").is_some());
    }

    #[test]
    fn test_display_total_never_negative() {
        let account = UserAccount {
            id: "u".to_string(),
            total_bytes: -40,
            cdate: Utc::now(),
            mdate: Utc::now(),
        };
        assert_eq!(account.for_display().total_bytes, 0);
        assert_eq!(account.total_bytes, -40);
    }

    #[test]
    fn test_object_json_shape() {
        let object = NewStoredObject {
            id: Uuid::nil(),
            url: "https://cdn/u/x".to_string(),
            owner_id: "u".to_string(),
            size: 3,
            content_type: "image/png".to_string(),
        }
        .into_stored(Utc::now());

        let value = serde_json::to_value(&object).unwrap();
        assert_eq!(value["ownerId"], "u");
        assert_eq!(value["contentType"], "image/png");
        assert_eq!(value["size"], 3);
    }
}
