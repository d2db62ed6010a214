//! Auth proxy.
//!
//! Forwards frontend API calls to the backend with the bearer token taken
//! from the `sessionToken` cookie. A backend 401 on a session that still has
//! a refresh token triggers one refresh and one retry:
//!
//! ```text
//! attempt ──401──> refresh ──ok──> retry ──non-401──> relay retry
//!    │                │              └──401 / error──> relay first 401
//!    │                └──rejected──> relay first 401, expire cookies
//!    └──other──> relay
//! ```
//!
//! Rotated cookies are issued whenever the refresh succeeded, even if the
//! retry did not.

mod error;
mod identity;
mod refresh;

pub use error::AuthError;
pub use identity::{DenyReason, IDENTITY_PATH, Identity};
pub use refresh::{REFRESH_PATH, RefreshCoordinator};

use axum::body::{Body, Bytes};
use axum::http::header::{ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::instrument;

use crate::backend::{BackendClient, BackendError, BackendRequest, BackendResponse, TokenPair};
use crate::config::CookieConfig;
use crate::middleware::request_id::REQUEST_ID_HEADER;
use crate::models::{CookieUpdate, SessionCookies, session::cookie_jar};

/// What the proxy answers with.
#[derive(Debug)]
pub enum Relay {
    /// A backend response to pass on.
    Backend(BackendResponse),
    /// Authentication was required and no session exists.
    Unauthenticated,
    /// The backend could not be reached.
    Upstream(BackendError),
}

impl Relay {
    /// The relayed backend response, if any.
    #[must_use]
    pub const fn backend(&self) -> Option<&BackendResponse> {
        match self {
            Self::Backend(response) => Some(response),
            _ => None,
        }
    }
}

impl IntoResponse for Relay {
    fn into_response(self) -> Response {
        match self {
            Self::Backend(response) => relay_backend(response),
            Self::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                Json(json!({"success": false, "message": "Unauthorized"})),
            )
                .into_response(),
            Self::Upstream(err) => {
                let message = match &err {
                    BackendError::NotConfigured => err.to_string(),
                    BackendError::Http(_) => "Backend request failed".to_string(),
                };
                let event_id = sentry::capture_error(&err);
                tracing::error!(
                    error = %err,
                    sentry_event_id = %event_id,
                    "Proxy request failed"
                );
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"success": false, "message": message})),
                )
                    .into_response()
            }
        }
    }
}

/// A relay together with the cookie change to send with it.
#[derive(Debug)]
pub struct ProxyOutcome {
    pub relay: Relay,
    pub cookies: Option<CookieUpdate>,
    pub policy: CookieConfig,
}

impl IntoResponse for ProxyOutcome {
    fn into_response(self) -> Response {
        (cookie_jar(self.cookies.as_ref(), &self.policy), self.relay).into_response()
    }
}

/// Forwards requests to the backend on behalf of a browser session.
#[derive(Clone)]
pub struct AuthProxy {
    backend: BackendClient,
    refresher: RefreshCoordinator,
    policy: CookieConfig,
}

impl AuthProxy {
    /// Create a proxy that issues cookies according to `policy`.
    #[must_use]
    pub fn new(backend: BackendClient, policy: CookieConfig) -> Self {
        let refresher = RefreshCoordinator::new(backend.clone());
        Self {
            backend,
            refresher,
            policy,
        }
    }

    /// Forward `request` and relay the backend's answer.
    ///
    /// With `require_auth` and no session cookie the backend is not
    /// contacted and the outcome is a 401.
    #[instrument(skip(self, session, request), fields(path = %request.path))]
    pub async fn forward(
        &self,
        session: &SessionCookies,
        request: &BackendRequest,
        require_auth: bool,
    ) -> ProxyOutcome {
        let (relay, cookies) = self.exchange(session, request, require_auth).await;
        ProxyOutcome {
            relay,
            cookies,
            policy: self.policy,
        }
    }

    /// Ask the backend who the session belongs to.
    ///
    /// Uses the same refresh-and-retry rule as [`forward`](Self::forward).
    #[instrument(skip_all)]
    pub async fn identify(&self, session: &SessionCookies, inbound: &HeaderMap) -> Identity {
        let request = BackendRequest::get(IDENTITY_PATH).with_headers(identity_headers(inbound));
        let (relay, cookies) = self.exchange(session, &request, true).await;

        let outcome = match relay {
            Relay::Backend(response) => DenyReason::check(&response),
            Relay::Unauthenticated => Err(DenyReason::LoginRequired),
            Relay::Upstream(err) => {
                tracing::warn!(error = %err, "Identity check failed");
                Err(DenyReason::Error(err.to_string()))
            }
        };

        Identity { outcome, cookies }
    }

    /// Exchange a refresh token directly.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingRefreshToken` without a refresh cookie,
    /// otherwise whatever the refresh exchange reports.
    pub async fn refresh(&self, session: &SessionCookies) -> Result<TokenPair, AuthError> {
        let refresh_token = session
            .refresh_token
            .as_ref()
            .ok_or(AuthError::MissingRefreshToken)?;
        self.refresher.refresh(refresh_token).await
    }

    /// Tell the backend the session is over. Failures are only logged.
    pub async fn logout(&self, session: &SessionCookies, inbound: &HeaderMap) {
        let Some(token) = session.session_token.as_ref() else {
            return;
        };
        let request = BackendRequest::post_json("/auth/logout", &json!({}))
            .with_headers(identity_headers(inbound));
        match self.backend.send(&request, Some(token)).await {
            Ok(response) if !response.status.is_success() => {
                tracing::debug!(status = %response.status, "Backend logout not acknowledged");
            }
            Ok(_) => {}
            Err(err) => tracing::warn!(error = %err, "Backend logout failed"),
        }
    }

    async fn exchange(
        &self,
        session: &SessionCookies,
        request: &BackendRequest,
        require_auth: bool,
    ) -> (Relay, Option<CookieUpdate>) {
        let token = session.session_token.as_ref();
        if token.is_none() && require_auth {
            return (Relay::Unauthenticated, None);
        }

        let first = match self.backend.send(request, token).await {
            Ok(response) => response,
            Err(err) => return (Relay::Upstream(err), None),
        };
        if first.status != StatusCode::UNAUTHORIZED {
            return (Relay::Backend(first), None);
        }
        let Some(refresh_token) = session.refresh_token.as_ref() else {
            return (Relay::Backend(first), None);
        };

        let pair = match self.refresher.refresh(refresh_token).await {
            Ok(pair) => pair,
            Err(err) => {
                tracing::info!(error = %err, "Session refresh failed");
                let cookies = err.session_expired().then_some(CookieUpdate::Expire);
                return (Relay::Backend(first), cookies);
            }
        };

        let relay = match self.backend.send(request, Some(&pair.session_token)).await {
            Ok(retried) if retried.status != StatusCode::UNAUTHORIZED => Relay::Backend(retried),
            Ok(_) => {
                tracing::info!("Retry with refreshed session was still unauthorized");
                Relay::Backend(first)
            }
            Err(err) => {
                tracing::warn!(error = %err, "Retry with refreshed session failed");
                Relay::Backend(first)
            }
        };

        (relay, Some(CookieUpdate::Rotate(pair)))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Headers for gateway-originated JSON calls.
fn identity_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    for name in [ACCEPT_LANGUAGE, HeaderName::from_static(REQUEST_ID_HEADER)] {
        if let Some(value) = inbound.get(&name) {
            headers.insert(name, value.clone());
        }
    }
    headers
}

/// Turn a backend response into the gateway's response.
///
/// JSON is passed through when it parses and replaced by `null` when it
/// does not. Anything else is copied byte for byte.
fn relay_backend(response: BackendResponse) -> Response {
    let is_json = response.declares_json();
    let BackendResponse {
        status,
        content_type,
        body,
    } = response;

    if matches!(status, StatusCode::NO_CONTENT | StatusCode::NOT_MODIFIED) {
        return status.into_response();
    }

    let (content_type, body) = if is_json {
        let content_type = HeaderValue::from_static("application/json");
        if serde_json::from_slice::<serde::de::IgnoredAny>(&body).is_ok() {
            (content_type, body)
        } else {
            (content_type, Bytes::from_static(b"null"))
        }
    } else {
        (
            content_type.unwrap_or_else(|| HeaderValue::from_static("application/octet-stream")),
            body,
        )
    };

    let mut response = (status, Body::from(body)).into_response();
    response.headers_mut().insert(CONTENT_TYPE, content_type);
    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;

    use super::*;

    async fn render(
        status: StatusCode,
        content_type: Option<&'static str>,
        body: &'static [u8],
    ) -> (StatusCode, Option<String>, Bytes) {
        let response = relay_backend(BackendResponse {
            status,
            content_type: content_type.map(HeaderValue::from_static),
            body: Bytes::from_static(body),
        });
        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_string());
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, content_type, body)
    }

    #[tokio::test]
    async fn test_valid_json_is_relayed_verbatim() {
        let raw = br#"{"success":true,"data":{"id":1}}"#;
        let (status, content_type, body) =
            render(StatusCode::OK, Some("application/json; charset=utf-8"), raw).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some("application/json"));
        assert_eq!(&body[..], raw);
    }

    #[tokio::test]
    async fn test_broken_or_empty_json_becomes_null() {
        let (status, _, body) =
            render(StatusCode::CREATED, Some("application/json"), b"{oops").await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(&body[..], b"null");

        let (_, content_type, body) = render(StatusCode::OK, None, b"").await;
        assert_eq!(content_type.as_deref(), Some("application/json"));
        assert_eq!(&body[..], b"null");
    }

    #[tokio::test]
    async fn test_non_json_is_relayed_byte_for_byte() {
        let (status, content_type, body) =
            render(StatusCode::OK, Some("text/csv"), b"id,total\n1,9.50\n").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some("text/csv"));
        assert_eq!(&body[..], b"id,total\n1,9.50\n");
    }

    #[tokio::test]
    async fn test_no_content_has_no_body() {
        let (status, _, body) = render(StatusCode::NO_CONTENT, Some("application/json"), b"").await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(body.is_empty());
    }

    #[test]
    fn test_identity_headers_force_json() {
        let mut inbound = HeaderMap::new();
        inbound.insert(ACCEPT, HeaderValue::from_static("text/html"));
        inbound.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("vi"));
        let headers = identity_headers(&inbound);
        assert_eq!(headers.get(ACCEPT).unwrap(), "application/json");
        assert_eq!(headers.get(ACCEPT_LANGUAGE).unwrap(), "vi");
    }
}
