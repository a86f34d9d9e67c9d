//! Cross-origin access for browser clients

use actix_cors::Cors;
use actix_web::http::{header, Method};

use crate::config::ServerSettings;

const PREFLIGHT_MAX_AGE_SECS: usize = 3600;

/// CORS layer for the API. With no configured origins any origin is
/// allowed and responses carry `Access-Control-Allow-Origin: *`.
pub fn cors_layer(settings: &ServerSettings) -> Cors {
    let cors = Cors::default()
        .allowed_methods([
            Method::GET,
            Method::HEAD,
            Method::PUT,
            Method::PATCH,
            Method::POST,
            Method::DELETE,
        ])
        .allow_any_header()
        .expose_headers([header::CONTENT_LENGTH])
        .max_age(PREFLIGHT_MAX_AGE_SECS);

    if settings.cors_allowed_origins.is_empty() {
        return cors.allow_any_origin().send_wildcard();
    }

    settings
        .cors_allowed_origins
        .iter()
        .fold(cors, |cors, origin| cors.allowed_origin(origin))
}
