//! Identity Middleware Service
//!
//! Actix-web middleware that resolves the requester for every non-public
//! path and rejects requests that arrive without a usable identity.

use actix_web::{
    body::{BoxBody, EitherBody},
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage, HttpResponse,
};
use futures::future::{ok, Ready, LocalBoxFuture};
use std::rc::Rc;
use tracing::{debug, warn};

use crate::config::IdentitySettings;
use super::auth::extract_requester;

/// Middleware factory for requester resolution
pub struct IdentityMiddleware {
    settings: IdentitySettings,
    /// Paths that don't require an identity
    public_paths: Vec<String>,
}

impl IdentityMiddleware {
    pub fn new(settings: IdentitySettings) -> Self {
        Self {
            settings,
            public_paths: vec![
                "/health".to_string(),
                "/swagger-ui".to_string(),
                "/api-docs".to_string(),
            ],
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for IdentityMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B, BoxBody>>;
    type Error = Error;
    type Transform = IdentityMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(IdentityMiddlewareService {
            service: Rc::new(service),
            settings: self.settings.clone(),
            public_paths: self.public_paths.clone(),
        })
    }
}

/// The actual middleware service
pub struct IdentityMiddlewareService<S> {
    service: Rc<S>,
    settings: IdentitySettings,
    public_paths: Vec<String>,
}

impl<S> IdentityMiddlewareService<S> {
    fn is_public_path(&self, path: &str) -> bool {
        self.public_paths.iter().any(|p| path.starts_with(p))
    }
}

impl<S, B> Service<ServiceRequest> for IdentityMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B, BoxBody>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, ctx: &mut core::task::Context<'_>) -> core::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();

        if self.is_public_path(req.path()) {
            return Box::pin(async move {
                let res = service.call(req).await?;
                Ok(res.map_into_left_body())
            });
        }

        let resolved = extract_requester(&req, &self.settings);

        Box::pin(async move {
            let requester = match resolved {
                Ok(requester) => requester,
                Err(e) => {
                    warn!(path = %req.path(), error = %e, "Rejected request without valid requester");
                    let response = HttpResponse::BadRequest()
                        .json(serde_json::json!({
                            "status": "error",
                            "error": "invalid_requester",
                            "message": e.to_string()
                        }));
                    return Ok(req.into_response(response).map_into_right_body());
                }
            };

            debug!(requester = %requester.id, "Requester resolved");
            req.extensions_mut().insert(requester);

            let res = service.call(req).await?;
            Ok(res.map_into_left_body())
        })
    }
}
