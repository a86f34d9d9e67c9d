//! File upload, listing and deletion endpoints

use actix_web::{http::header::CONTENT_TYPE, web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::AppState;
use crate::db::StoredObject;
use crate::domain::{Cursor, PageRequest};
use crate::engine::StoreError;
use super::{error_response, require_requester, ErrorResponse};

/// Response for a stored upload
#[derive(Serialize, ToSchema)]
pub struct UploadResponse {
    pub status: &'static str,
    pub content: StoredObject,
}

/// One page of the requester's files, newest first
#[derive(Serialize, ToSchema)]
pub struct FilesResponse {
    pub status: &'static str,
    pub content: Vec<StoredObject>,
    /// Cursor for older files; pass as `before`
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub next: Option<Cursor>,
    /// Cursor for newer files; pass as `after`
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub prev: Option<Cursor>,
    pub limit: usize,
}

#[derive(Serialize, ToSchema)]
pub struct StatusResponse {
    pub status: &'static str,
}

/// Listing parameters. Cursors are Unix timestamps in seconds.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListFilesQuery {
    /// Return files created strictly after this time, ignored when empty
    pub after: Option<String>,
    /// Return files created strictly before this time, ignored when `after` is set
    pub before: Option<String>,
    /// Page size, default 20, at most 100
    pub limit: Option<String>,
}

/// POST /files - Upload a file as the raw request body
#[utoipa::path(
    post,
    path = "/files",
    tag = "storage",
    request_body(content = Vec<u8>, content_type = "application/octet-stream", description = "Raw file bytes; the Content-Type header is recorded"),
    responses(
        (status = 200, description = "File stored", body = UploadResponse),
        (status = 403, description = "Quota exceeded", body = ErrorResponse),
        (status = 500, description = "Object store, database or decode failure", body = ErrorResponse)
    )
)]
pub async fn upload_file(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Bytes,
) -> HttpResponse {
    let requester = match require_requester(&req) {
        Ok(requester) => requester,
        Err(response) => return response,
    };

    let content_type = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    info!(
        requester = %requester.id,
        content_type = %content_type,
        size = body.len(),
        "Processing upload"
    );

    match state.engine.admission.admit(&requester.id, body, content_type).await {
        Ok(stored) => HttpResponse::Ok().json(UploadResponse {
            status: "ok",
            content: stored,
        }),
        Err(e) => error_response(&e),
    }
}

/// GET /files - List the requester's files
#[utoipa::path(
    get,
    path = "/files",
    tag = "storage",
    params(ListFilesQuery),
    responses(
        (status = 200, description = "A page of files", body = FilesResponse),
        (status = 400, description = "Invalid cursor", body = ErrorResponse)
    )
)]
pub async fn list_files(
    req: HttpRequest,
    state: web::Data<AppState>,
    query: web::Query<ListFilesQuery>,
) -> HttpResponse {
    let requester = match require_requester(&req) {
        Ok(requester) => requester,
        Err(response) => return response,
    };

    let page_request = match PageRequest::from_query(
        query.after.as_deref(),
        query.before.as_deref(),
        query.limit.as_deref(),
    ) {
        Ok(page_request) => page_request,
        Err(e) => return error_response(&StoreError::from(e)),
    };

    match state.engine.listing.list(&requester.id, page_request).await {
        Ok(page) => HttpResponse::Ok().json(FilesResponse {
            status: "ok",
            content: page.items,
            next: page.next,
            prev: page.prev,
            limit: page.limit,
        }),
        Err(e) => error_response(&e),
    }
}

/// DELETE /file/{id} - Delete one of the requester's files
#[utoipa::path(
    delete,
    path = "/file/{id}",
    tag = "storage",
    params(
        ("id" = String, Path, description = "File id")
    ),
    responses(
        (status = 200, description = "File deleted", body = StatusResponse),
        (status = 403, description = "Requester does not own the file", body = ErrorResponse),
        (status = 404, description = "No such file", body = ErrorResponse)
    )
)]
pub async fn delete_file(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> HttpResponse {
    let requester = match require_requester(&req) {
        Ok(requester) => requester,
        Err(response) => return response,
    };

    let raw_id = path.into_inner();
    let object_id = match Uuid::parse_str(&raw_id) {
        Ok(id) => id,
        Err(_) => {
            return error_response(&StoreError::InvalidRequest(format!("invalid file id: {}", raw_id)));
        }
    };

    match state.engine.deletion.delete(&requester.id, object_id).await {
        Ok(_) => HttpResponse::Ok().json(StatusResponse { status: "ok" }),
        Err(e) => error_response(&e),
    }
}
