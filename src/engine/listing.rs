//! Keyset pagination over an owner's objects
//!
//! Pages are anchored on creation time rather than offsets. Every page is
//! returned newest first. A page carries up to two cursors:
//!
//! - `next` points at older objects and is followed with `before`
//! - `prev` points at newer objects and is followed with `after`
//!
//! Each query over-fetches one row to learn whether more rows exist past
//! the page boundary.
//!
//! Cursors carry whole seconds. A cursor names the second its row was
//! created in, so `after` starts at the following second and `before` stops
//! at the start of the cursor's second; neither returns the cursor's row.

use chrono::Duration;
use std::sync::Arc;
use tracing::debug;

use crate::db::{ListWindow, MetadataRepository, StoredObject};
use crate::domain::{Cursor, PageDirection, PageRequest};
use super::StoreError;

/// One page of a listing
#[derive(Debug, Clone)]
pub struct Page {
    /// Newest first, at most `limit` items
    pub items: Vec<StoredObject>,
    pub next: Option<Cursor>,
    pub prev: Option<Cursor>,
    pub limit: usize,
}

#[derive(Clone)]
pub struct ListingEngine {
    repo: Arc<dyn MetadataRepository>,
}

impl ListingEngine {
    pub fn new(repo: Arc<dyn MetadataRepository>) -> Self {
        Self { repo }
    }

    /// Read one page of `owner_id`'s objects
    pub async fn list(&self, owner_id: &str, request: PageRequest) -> Result<Page, StoreError> {
        let limit = request.limit.max(1);
        let window = match request.direction {
            PageDirection::Latest => ListWindow::Latest,
            PageDirection::After(cursor) => {
                ListWindow::Since(cursor.to_datetime() + Duration::seconds(1))
            }
            PageDirection::Before(cursor) => ListWindow::Before(cursor.to_datetime()),
        };

        let rows = self
            .repo
            .list_objects(owner_id, window, limit as i64 + 1)
            .await?;

        let page = build_page(request.direction, rows, limit);

        debug!(
            owner_id = %owner_id,
            direction = ?request.direction,
            items = page.items.len(),
            next = ?page.next,
            prev = ?page.prev,
            "Listed page"
        );

        Ok(page)
    }
}

/// Turn an over-fetched batch (in query order) into a page with cursors.
///
/// `rows` holds up to `limit + 1` rows: newest first for `Latest` and
/// `Before`, oldest first for `After`.
pub fn build_page(direction: PageDirection, mut rows: Vec<StoredObject>, limit: usize) -> Page {
    let limit = limit.max(1);
    let has_more = rows.len() > limit;
    let mut next = None;
    let mut prev = None;

    match direction {
        PageDirection::Latest => {
            if has_more {
                next = Some(cursor_at(&rows, limit - 1));
                rows.truncate(limit);
            }
        }
        PageDirection::After(_) => {
            if !rows.is_empty() {
                next = Some(cursor_at(&rows, 0));
            }
            if has_more {
                prev = Some(cursor_at(&rows, limit.saturating_sub(2)));
                rows.truncate(limit);
            }
            rows.reverse();
        }
        PageDirection::Before(_) => {
            if !rows.is_empty() {
                prev = Some(cursor_at(&rows, 0));
            }
            if has_more {
                next = Some(cursor_at(&rows, limit.saturating_sub(2)));
                rows.truncate(limit);
            }
        }
    }

    Page { items: rows, next, prev, limit }
}

fn cursor_at(rows: &[StoredObject], index: usize) -> Cursor {
    Cursor::from_datetime(&rows[index].cdate)
}
