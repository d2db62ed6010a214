//! Session endpoints.
//!
//! Login and registration are the only calls that hand out tokens. Tokens
//! go into HTTP-only cookies and are removed from the JSON the browser sees.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use serde_json::json;

use crate::backend::{BackendRequest, TokenPair, forwarded_headers, strip_tokens};
use crate::error::AppError;
use crate::models::{CookieUpdate, SessionCookies, session::cookie_jar};
use crate::services::auth::IDENTITY_PATH;
use crate::services::{ProxyOutcome, Relay};
use crate::state::AppState;

/// `GET`/`PUT /api/auth/me`.
pub async fn me(
    State(state): State<AppState>,
    jar: CookieJar,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> ProxyOutcome {
    let session = SessionCookies::from_jar(&jar);
    let request = BackendRequest {
        method,
        path: IDENTITY_PATH.to_string(),
        query: uri.query().map(String::from),
        headers: forwarded_headers(&headers),
        body,
    };
    state.proxy().forward(&session, &request, true).await
}

/// `POST /api/auth/login`.
pub async fn login(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    issue_session(&state, "/auth/login", &headers, body).await
}

/// `POST /api/auth/register`.
pub async fn register(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    issue_session(&state, "/auth/register", &headers, body).await
}

/// `POST /api/auth/logout`.
///
/// Always clears the cookies, whatever the backend says.
pub async fn logout(State(state): State<AppState>, jar: CookieJar, headers: HeaderMap) -> Response {
    let session = SessionCookies::from_jar(&jar);
    state.proxy().logout(&session, &headers).await;

    (
        cookie_jar(Some(&CookieUpdate::Expire), &state.config().cookies),
        Json(json!({"success": true})),
    )
        .into_response()
}

/// `POST /api/auth/refresh`.
///
/// # Errors
///
/// 401 without a refresh cookie; the backend's status (with both cookies
/// expired) when it rejects the token.
pub async fn refresh(State(state): State<AppState>, jar: CookieJar) -> Result<Response, AppError> {
    let session = SessionCookies::from_jar(&jar);
    let policy = state.config().cookies;

    match state.proxy().refresh(&session).await {
        Ok(pair) => Ok((
            cookie_jar(Some(&CookieUpdate::Rotate(pair)), &policy),
            Json(json!({"success": true})),
        )
            .into_response()),
        Err(err) if err.session_expired() => Ok((
            cookie_jar(Some(&CookieUpdate::Expire), &policy),
            AppError::Auth(err),
        )
            .into_response()),
        Err(err) => Err(err.into()),
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Forward a credential exchange and move any issued tokens into cookies.
async fn issue_session(
    state: &AppState,
    path: &str,
    headers: &HeaderMap,
    body: Bytes,
) -> Response {
    let request = BackendRequest {
        method: Method::POST,
        path: path.to_string(),
        query: None,
        headers: forwarded_headers(headers),
        body,
    };
    let outcome = state
        .proxy()
        .forward(&SessionCookies::default(), &request, false)
        .await;

    let Some((status, mut payload, pair)) = issued_tokens(&outcome) else {
        return outcome.into_response();
    };
    strip_tokens(&mut payload);
    tracing::info!(path, "Session issued");

    (
        status,
        cookie_jar(Some(&CookieUpdate::Rotate(pair)), &state.config().cookies),
        Json(payload),
    )
        .into_response()
}

/// Status, body and tokens of a successful credential exchange.
fn issued_tokens(outcome: &ProxyOutcome) -> Option<(StatusCode, serde_json::Value, TokenPair)> {
    let Relay::Backend(response) = &outcome.relay else {
        return None;
    };
    if !response.status.is_success() {
        return None;
    }
    let payload = response.json()?;
    let pair = TokenPair::from_body(&payload)?;
    Some((response.status, payload, pair))
}
