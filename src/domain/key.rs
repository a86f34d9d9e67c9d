//! Object store keys
//!
//! ## Layout
//! ```text
//! {bucket}/
//! └── {owner_id}/
//!     └── {object_id}{.ext}      # extension derived from the content type
//! ```

use uuid::Uuid;

use super::mime;

/// Location of an object in the bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectKey {
    pub owner_id: String,
    pub object_id: Uuid,
    pub extension: Option<&'static str>,
}

impl ObjectKey {
    /// Key for an object of the given (normalized) content type
    pub fn new(owner_id: &str, object_id: Uuid, content_type: &str) -> Self {
        Self {
            owner_id: owner_id.to_string(),
            object_id,
            extension: mime::extension_for(content_type),
        }
    }

    /// `{owner_id}/{object_id}{.ext}`
    pub fn to_key(&self) -> String {
        match self.extension {
            Some(ext) => format!("{}/{}.{}", self.owner_id, self.object_id, ext),
            None => format!("{}/{}", self.owner_id, self.object_id),
        }
    }

    /// Public URL: the configured base with the key appended verbatim
    pub fn public_url(&self, public_base_url: &str) -> String {
        format!("{}{}", public_base_url, self.to_key())
    }
}
