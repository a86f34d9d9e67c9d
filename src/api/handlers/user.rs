//! Storage account endpoint

use actix_web::{web, HttpRequest, HttpResponse};

use crate::AppState;
use super::{error_response, require_requester, ErrorResponse};
use crate::db::UserAccount;

/// GET /user - Storage usage of the requester
#[utoipa::path(
    get,
    path = "/user",
    tag = "storage",
    responses(
        (status = 200, description = "Requester's storage account", body = UserAccount),
        (status = 400, description = "Missing or invalid requester", body = ErrorResponse),
        (status = 404, description = "Requester has never uploaded", body = ErrorResponse)
    )
)]
pub async fn get_user(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    let requester = match require_requester(&req) {
        Ok(requester) => requester,
        Err(response) => return response,
    };

    match state.engine.ledger.account(&requester.id).await {
        Ok(account) => HttpResponse::Ok().json(account),
        Err(e) => error_response(&e),
    }
}
