//! Keyset pagination cursors
//!
//! A cursor is a creation-time boundary with whole-second resolution. It is
//! handed to clients as a decimal Unix timestamp string and parsed back from
//! the `after` / `before` query parameters. Objects created within the same
//! second are not strictly orderable by cursor.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::fmt;
use thiserror::Error;

/// Page size used when `limit` is absent or unusable
pub const DEFAULT_PAGE_LIMIT: usize = 20;

/// Hard upper bound on `limit`
pub const MAX_PAGE_LIMIT: usize = 100;

/// Cursor parsing errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CursorError {
    #[error("invalid {param}: {value:?}")]
    Invalid { param: &'static str, value: String },
}

/// Creation-time boundary, in Unix seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cursor(i64);

impl Cursor {
    pub fn from_secs(secs: i64) -> Self {
        Cursor(secs)
    }

    /// Cursor for the second an object was created in
    pub fn from_datetime(at: &DateTime<Utc>) -> Self {
        Cursor(at.timestamp())
    }

    /// Parse a cursor from a query parameter
    pub fn parse(param: &'static str, raw: &str) -> Result<Self, CursorError> {
        let secs = raw.trim().parse::<i64>().map_err(|_| CursorError::Invalid {
            param,
            value: raw.to_string(),
        })?;

        // Reject values chrono cannot represent up front
        if DateTime::<Utc>::from_timestamp(secs, 0).is_none() {
            return Err(CursorError::Invalid {
                param,
                value: raw.to_string(),
            });
        }

        Ok(Cursor::from_secs(secs))
    }

    pub fn as_secs(&self) -> i64 {
        self.0
    }

    /// Start of the cursor's second
    pub fn to_datetime(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(self.0, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_secs())
    }
}

impl Serialize for Cursor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.as_secs())
    }
}

/// Which side of a cursor a page is read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageDirection {
    /// Newest objects first, no boundary
    Latest,
    /// Objects strictly newer than the cursor
    After(Cursor),
    /// Objects strictly older than the cursor
    Before(Cursor),
}

/// A validated listing request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub direction: PageDirection,
    pub limit: usize,
}

impl PageRequest {
    /// Build a page request from raw query parameters.
    ///
    /// Empty strings count as absent. `after` wins when both cursors are
    /// given. A non-numeric or non-positive `limit` falls back to the default
    /// and anything above the cap is clamped.
    pub fn from_query(
        after: Option<&str>,
        before: Option<&str>,
        limit: Option<&str>,
    ) -> Result<Self, CursorError> {
        let after = after.filter(|s| !s.is_empty());
        let before = before.filter(|s| !s.is_empty());

        let limit = parse_limit(limit);

        if let Some(raw) = after {
            Ok(PageRequest::after(Cursor::parse("after", raw)?, limit))
        } else if let Some(raw) = before {
            Ok(PageRequest::before(Cursor::parse("before", raw)?, limit))
        } else {
            Ok(PageRequest::latest(limit))
        }
    }

    pub fn latest(limit: usize) -> Self {
        PageRequest { direction: PageDirection::Latest, limit }
    }

    pub fn after(cursor: Cursor, limit: usize) -> Self {
        PageRequest { direction: PageDirection::After(cursor), limit }
    }

    pub fn before(cursor: Cursor, limit: usize) -> Self {
        PageRequest { direction: PageDirection::Before(cursor), limit }
    }
}

fn parse_limit(raw: Option<&str>) -> usize {
    match raw.and_then(|s| s.trim().parse::<i64>().ok()) {
        Some(n) if n >= 1 => (n as u64).min(MAX_PAGE_LIMIT as u64) as usize,
        _ => DEFAULT_PAGE_LIMIT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_cursor_parse() {
        assert_eq!(Cursor::parse("after", "1700000000").unwrap().as_secs(), 1_700_000_000);
        assert_eq!(Cursor::parse("after", " 42 ").unwrap().as_secs(), 42);
        assert!(Cursor::parse("before", "yesterday").is_err());
        assert!(Cursor::parse("before", "1.5").is_err());
        assert!(Cursor::parse("before", &i64::MAX.to_string()).is_err());
    }

    #[test]
    fn test_cursor_truncates_to_seconds() {
        let at = Utc.timestamp_opt(1_700_000_000, 999_000_000).unwrap();
        let cursor = Cursor::from_datetime(&at);
        assert_eq!(cursor.as_secs(), 1_700_000_000);
        assert_eq!(cursor.to_datetime(), Utc.timestamp_opt(1_700_000_000, 0).unwrap());
    }

    #[test]
    fn test_cursor_serializes_as_string() {
        let json = serde_json::to_string(&Cursor::from_secs(1234)).unwrap();
        assert_eq!(json, "\"1234\"");
    }

    #[test]
    fn test_limit_parsing() {
        assert_eq!(parse_limit(None), 20);
        assert_eq!(parse_limit(Some("abc")), 20);
        assert_eq!(parse_limit(Some("0")), 20);
        assert_eq!(parse_limit(Some("-3")), 20);
        assert_eq!(parse_limit(Some("5")), 5);
        assert_eq!(parse_limit(Some("100")), 100);
        assert_eq!(parse_limit(Some("250")), 100);
    }

    #[test]
    fn test_after_wins_over_before() {
        let req = PageRequest::from_query(Some("10"), Some("20"), None).unwrap();
        assert_eq!(req.direction, PageDirection::After(Cursor::from_secs(10)));
        assert_eq!(req.limit, DEFAULT_PAGE_LIMIT);
    }

    #[test]
    fn test_empty_cursor_is_absent() {
        let req = PageRequest::from_query(Some(""), Some(""), Some("7")).unwrap();
        assert_eq!(req.direction, PageDirection::Latest);
        assert_eq!(req.limit, 7);

        let req = PageRequest::from_query(Some(""), Some("30"), None).unwrap();
        assert_eq!(req.direction, PageDirection::Before(Cursor::from_secs(30)));
    }

    #[test]
    fn test_invalid_cursor_names_param() {
        let err = PageRequest::from_query(None, Some("nope"), None).unwrap_err();
        assert_eq!(err.to_string(), "invalid before: \"nope\"");
    }
}
