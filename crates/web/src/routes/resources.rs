//! Resource proxies: `/api/{resource}/...` to backend `/{resource}/...`.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, Uri},
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use emporium_core::OrderCreated;
use serde_json::Value;

use crate::backend::{BackendRequest, forwarded_headers};
use crate::error::AppError;
use crate::models::SessionCookies;
use crate::state::AppState;

/// Who may call a resource path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Forwarded with a bearer token when there is one.
    Public,
    /// 401 without a session cookie.
    Authenticated,
}

/// Access rule for a backend path, or `None` for unknown resources.
///
/// Paths the URL parser would rewrite before they reach the backend have no
/// rule, so the resource checked here is the resource the backend serves.
#[must_use]
pub fn access_for(api_path: &str, method: &Method) -> Option<Access> {
    if !is_literal_path(api_path) {
        return None;
    }

    let mut segments = api_path.trim_start_matches('/').split('/');
    let resource = segments.next().unwrap_or_default();
    let action = segments.next();

    match resource {
        "products" | "categories" if *method == Method::GET || *method == Method::HEAD => {
            Some(Access::Public)
        }
        "products" | "categories" => Some(Access::Authenticated),
        "payments" if action == Some("callback") => Some(Access::Public),
        "payments" | "orders" | "users" | "account" | "cart" | "analytics" => {
            Some(Access::Authenticated)
        }
        _ => None,
    }
}

/// Forward any `/api/*` call that has no dedicated handler.
pub async fn forward(
    State(state): State<AppState>,
    jar: CookieJar,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    // Raw path: percent-encoded segments reach the backend as sent
    let api_path = uri.path().strip_prefix("/api").unwrap_or_else(|| uri.path());
    let Some(access) = access_for(api_path, &method) else {
        return AppError::NotFound(api_path.to_string()).into_response();
    };

    let creates_order = method == Method::POST && is_order_collection(api_path);
    let request = BackendRequest {
        method,
        path: api_path.to_string(),
        query: uri.query().map(String::from),
        headers: forwarded_headers(&headers),
        body,
    };

    let session = SessionCookies::from_jar(&jar);
    let outcome = state
        .proxy()
        .forward(&session, &request, access == Access::Authenticated)
        .await;

    let created = outcome
        .relay
        .backend()
        .filter(|response| creates_order && response.status.is_success());
    if let Some(response) = created {
        let event = OrderCreated::from_response(&response.json().unwrap_or(Value::Null));
        let delivered = state.notifications().publish(&event);
        tracing::info!(order_id = ?event.id, delivered, "Order created");
    }

    outcome.into_response()
}

// =============================================================================
// Helper Functions
// =============================================================================

/// No dot segments (`.`, `..`, or their `%2e` spellings), no empty segments
/// except a trailing slash, and no encoded separators.
fn is_literal_path(api_path: &str) -> bool {
    let path = api_path.strip_prefix('/').unwrap_or(api_path);
    let path = path.strip_suffix('/').unwrap_or(path);

    path.split('/').all(|segment| {
        let lower = segment.to_ascii_lowercase();
        let decoded = lower.replace("%2e", ".");
        !segment.is_empty()
            && decoded != "."
            && decoded != ".."
            && !lower.contains("%2f")
            && !lower.contains("%5c")
    })
}

fn is_order_collection(api_path: &str) -> bool {
    api_path.trim_matches('/') == "orders"
}
