//! Admin console endpoints.

use axum::{
    Json,
    extract::{Query, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use emporium_core::Principal;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, set_sentry_user};
use crate::models::{NavItem, SessionCookies, session::cookie_jar};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct NavigationQuery {
    pub locale: Option<String>,
}

#[derive(Debug, Serialize)]
struct NavigationPayload {
    user: Principal,
    locale: String,
    sections: Vec<NavItem>,
}

/// `GET /api/admin/navigation?locale=xx`.
pub async fn navigation(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Query(query): Query<NavigationQuery>,
) -> Response {
    let (jar, principal) = match require_admin(&state, &jar, &headers).await {
        Ok(granted) => granted,
        Err(denied) => return denied,
    };

    let locales = &state.config().locales;
    let locale = query
        .locale
        .filter(|l| locales.is_supported(l))
        .unwrap_or_else(|| locales.default.clone());

    let payload = NavigationPayload {
        user: principal,
        sections: NavItem::menu(&locale),
        locale,
    };

    (jar, Json(serde_json::json!({"success": true, "data": payload}))).into_response()
}

/// Check that the request comes from an ADMIN or STAFF principal.
///
/// Either way the returned jar carries any cookie change from a refresh
/// during the check.
///
/// # Errors
///
/// Returns a ready 401/403 (or 500) JSON response when access is denied.
pub async fn require_admin(
    state: &AppState,
    jar: &CookieJar,
    headers: &HeaderMap,
) -> Result<(CookieJar, Principal), Response> {
    let session = SessionCookies::from_jar(jar);
    let identity = state.proxy().identify(&session, headers).await;
    let jar = cookie_jar(identity.cookies.as_ref(), &state.config().cookies);

    match identity.outcome {
        Ok(principal) if principal.role.can_access_admin() => {
            set_sentry_user(&principal.id, Some(principal.email.as_str()));
            Ok((jar, principal))
        }
        Ok(principal) => Err((
            jar,
            AppError::Forbidden(format!("role {} may not use the admin console", principal.role)),
        )
            .into_response()),
        Err(reason) => Err((jar, AppError::from(reason)).into_response()),
    }
}
