//! HTTP route handlers for the gateway.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                      - Liveness
//! GET  /health/ready                - Readiness (backend reachable)
//!
//! # Session
//! GET  /api/auth/me                 - Current user (auth required)
//! PUT  /api/auth/me                 - Update current user (auth required)
//! POST /api/auth/login              - Login; tokens move into cookies
//! POST /api/auth/register           - Register; tokens move into cookies
//! POST /api/auth/logout             - Logout; cookies cleared
//! POST /api/auth/refresh            - Exchange the refresh cookie
//!
//! # Admin
//! GET  /api/admin/navigation        - Admin menu (ADMIN or STAFF)
//! GET  /api/notifications/sse       - Order event stream (ADMIN or STAFF)
//!
//! # Resources
//! ANY  /api/{resource}/...          - Proxied to backend /{resource}/...
//! ```
//!
//! Everything else is the frontend bundle, served behind the route guard.

pub mod admin;
pub mod auth;
pub mod health;
pub mod notifications;
pub mod resources;

use axum::{
    Router,
    routing::{any, get, post},
};

use crate::state::AppState;

/// Create the API and health routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .route("/api/auth/me", get(auth::me).put(auth::me))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/refresh", post(auth::refresh))
        .route("/api/admin/navigation", get(admin::navigation))
        .route("/api/notifications/sse", get(notifications::subscribe))
        .route("/api", any(resources::forward))
        .route("/api/{*path}", any(resources::forward))
}
