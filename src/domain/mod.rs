//! Domain types and models

mod cursor;
mod key;
pub mod mime;

pub use cursor::{Cursor, CursorError, PageDirection, PageRequest};
pub use key::ObjectKey;
