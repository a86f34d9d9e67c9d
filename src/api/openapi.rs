//! OpenAPI 3.0 specification definition

use utoipa::OpenApi;

use crate::api::handlers::{
    ErrorResponse,
    health::HealthResponse,
    files::{UploadResponse, FilesResponse, StatusResponse},
};
use crate::db::{UserAccount, StoredObject};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Media Store API",
        version = "1.0.0",
        description = "Per-user media storage with quota accounting and cursor pagination",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "/", description = "Current server")
    ),
    tags(
        (name = "system", description = "System health and status endpoints"),
        (name = "storage", description = "Uploads, listings, deletions and quota usage")
    ),
    paths(
        crate::api::handlers::health::health_check,
        crate::api::handlers::user::get_user,
        crate::api::handlers::files::upload_file,
        crate::api::handlers::files::list_files,
        crate::api::handlers::files::delete_file,
    ),
    components(
        schemas(
            HealthResponse,
            ErrorResponse,
            UserAccount,
            StoredObject,
            UploadResponse,
            FilesResponse,
            StatusResponse,
        )
    )
)]
pub struct ApiDoc;
