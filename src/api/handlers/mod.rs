//! HTTP request handlers

pub mod health;
pub mod user;
pub mod files;

use actix_web::{http::StatusCode, HttpRequest, HttpResponse};
use serde::Serialize;
use tracing::{error, warn};
use utoipa::ToSchema;

use crate::api::middleware::{Requester, RequesterExt};
use crate::engine::StoreError;

/// Error response
#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub error: String,
    pub message: String,
}

/// Map an engine error to its HTTP response
pub fn error_response(err: &StoreError) -> HttpResponse {
    let status = StatusCode::from_u16(err.status_code())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    if status.is_server_error() {
        error!(error = %err, code = err.error_code(), "Request failed");
    } else {
        warn!(error = %err, code = err.error_code(), "Request rejected");
    }

    HttpResponse::build(status).json(ErrorResponse {
        status: "error",
        error: err.error_code().to_string(),
        message: err.to_string(),
    })
}

/// Requester resolved by the identity middleware, or a 400 response
pub fn require_requester(req: &HttpRequest) -> Result<Requester, HttpResponse> {
    req.requester().ok_or_else(|| {
        HttpResponse::BadRequest().json(ErrorResponse {
            status: "error",
            error: "invalid_requester".to_string(),
            message: "invalid requester".to_string(),
        })
    })
}
