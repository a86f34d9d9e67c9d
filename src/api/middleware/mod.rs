//! API Middleware Module
//!
//! Resolves the requester identity propagated by the upstream gateway and
//! answers CORS preflights for browser clients.

pub mod auth;
pub mod cors;
pub mod service;

pub use auth::{Requester, RequesterExt};
pub use cors::cors_layer;
pub use service::IdentityMiddleware;
