//! Requester identity
//!
//! Authentication happens upstream. The gateway forwards the authenticated
//! user id in a header; this module validates its shape and exposes it to
//! handlers through request extensions.

use actix_web::{dev::ServiceRequest, HttpMessage};
use thiserror::Error;

use crate::config::IdentitySettings;

/// Authenticated requester stored in request extensions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requester {
    pub id: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("missing {0} header")]
    Missing(String),
    #[error("invalid requester id")]
    Malformed,
}

/// Read and validate the requester id header
pub fn extract_requester(
    req: &ServiceRequest,
    settings: &IdentitySettings,
) -> Result<Requester, IdentityError> {
    let value = req
        .headers()
        .get(settings.header.as_str())
        .ok_or_else(|| IdentityError::Missing(settings.header.clone()))?;

    let id = value.to_str().map_err(|_| IdentityError::Malformed)?.trim();
    validate_requester_id(id, settings.id_length)?;

    Ok(Requester { id: id.to_string() })
}

/// Ids are fixed-length and end up in object keys, so only ASCII
/// alphanumerics, `-` and `_` are accepted.
fn validate_requester_id(id: &str, expected_len: usize) -> Result<(), IdentityError> {
    if id.len() != expected_len {
        return Err(IdentityError::Malformed);
    }
    if !id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_') {
        return Err(IdentityError::Malformed);
    }
    Ok(())
}

/// Access the requester resolved by [`IdentityMiddleware`](super::IdentityMiddleware)
pub trait RequesterExt {
    fn requester(&self) -> Option<Requester>;
}

impl<T: HttpMessage> RequesterExt for T {
    fn requester(&self) -> Option<Requester> {
        self.extensions().get::<Requester>().cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    fn settings() -> IdentitySettings {
        IdentitySettings {
            header: "requester-id".to_string(),
            id_length: 8,
        }
    }

    #[test]
    fn test_valid_requester() {
        let req = TestRequest::default()
            .insert_header(("requester-id", "CCab_-12"))
            .to_srv_request();
        assert_eq!(
            extract_requester(&req, &settings()),
            Ok(Requester { id: "CCab_-12".to_string() })
        );
    }

    #[test]
    fn test_missing_header() {
        let req = TestRequest::default().to_srv_request();
        assert_eq!(
            extract_requester(&req, &settings()),
            Err(IdentityError::Missing("requester-id".to_string()))
        );
    }

    #[test]
    fn test_wrong_length_or_charset() {
        for bad in ["short", "waytoolongid", "../../x", "abc def!"] {
            let req = TestRequest::default()
                .insert_header(("requester-id", bad))
                .to_srv_request();
            assert_eq!(extract_requester(&req, &settings()), Err(IdentityError::Malformed), "{}", bad);
        }
    }
}
