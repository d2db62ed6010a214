//! Backend API client.
//!
//! The backend owns products, orders, users and sessions. This client only
//! moves bytes: it builds the target URL from the configured base, attaches
//! a bearer token when one is given and hands back status, content type and
//! body untouched. Interpreting responses is up to the caller.

mod tokens;

pub use tokens::{TokenPair, strip_tokens};

use std::sync::Arc;

use axum::body::Bytes;
use axum::http::header::{ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use thiserror::Error;
use tracing::instrument;

use crate::config::BackendConfig;
use crate::middleware::request_id::REQUEST_ID_HEADER;

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// No backend base URL is configured.
    #[error("Backend API is not configured")]
    NotConfigured,

    /// HTTP request failed (connect, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// A request to send to the backend.
#[derive(Debug, Clone)]
pub struct BackendRequest {
    pub method: Method,
    /// Path below the API base, starting with `/`.
    pub path: String,
    /// Raw query string, without the leading `?`.
    pub query: Option<String>,
    /// Headers to pass through (see [`forwarded_headers`]).
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl BackendRequest {
    /// A body-less `GET`.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            query: None,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// A `POST` carrying a JSON document.
    #[must_use]
    pub fn post_json(path: impl Into<String>, body: &Value) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Self {
            method: Method::POST,
            path: path.into(),
            query: None,
            headers,
            body: Bytes::from(body.to_string()),
        }
    }

    /// Replace the forwarded headers.
    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }
}

/// What the backend answered.
#[derive(Debug, Clone)]
pub struct BackendResponse {
    pub status: StatusCode,
    pub content_type: Option<HeaderValue>,
    pub body: Bytes,
}

impl BackendResponse {
    /// Whether the declared content type is JSON (or missing).
    #[must_use]
    pub fn declares_json(&self) -> bool {
        self.content_type
            .as_ref()
            .and_then(|v| v.to_str().ok())
            .is_none_or(|ct| ct.contains("json"))
    }

    /// The body parsed as JSON, or `None` when empty or malformed.
    #[must_use]
    pub fn json(&self) -> Option<Value> {
        serde_json::from_slice(&self.body).ok()
    }
}

/// Pick the inbound headers the backend should see.
///
/// Cookies and the inbound `Authorization` header are never forwarded; the
/// bearer token comes from the session cookie instead.
#[must_use]
pub fn forwarded_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for name in [CONTENT_TYPE, ACCEPT, ACCEPT_LANGUAGE] {
        if let Some(value) = inbound.get(&name) {
            headers.insert(name, value.clone());
        }
    }
    if let Some(value) = inbound.get(REQUEST_ID_HEADER) {
        headers.insert(REQUEST_ID_HEADER, value.clone());
    }
    headers
}

/// Client for the backend REST API.
///
/// Cheaply cloneable; all clones share one connection pool.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<BackendClientInner>,
}

struct BackendClientInner {
    client: reqwest::Client,
    base_url: Option<String>,
}

impl BackendClient {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built (TLS backend
    /// initialization).
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("Emporium/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(BackendClientInner {
                client,
                base_url: config.api_url.clone(),
            }),
        })
    }

    /// Whether a backend base URL is configured.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.inner.base_url.is_some()
    }

    /// Build the absolute URL for a backend path.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::NotConfigured` when no base URL is set.
    pub fn url(&self, path: &str, query: Option<&str>) -> Result<String, BackendError> {
        let base = self
            .inner
            .base_url
            .as_deref()
            .ok_or(BackendError::NotConfigured)?;

        let mut url = format!("{base}/{}", path.trim_start_matches('/'));
        if let Some(query) = query.filter(|q| !q.is_empty()) {
            url.push('?');
            url.push_str(query);
        }
        Ok(url)
    }

    /// Send a request, optionally authenticated with a bearer token.
    ///
    /// Any HTTP status is a successful exchange; only transport failures
    /// are errors.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is not configured or unreachable.
    #[instrument(skip(self, request, token), fields(method = %request.method, path = %request.path))]
    pub async fn send(
        &self,
        request: &BackendRequest,
        token: Option<&SecretString>,
    ) -> Result<BackendResponse, BackendError> {
        let url = self.url(&request.path, request.query.as_deref())?;

        let mut builder = self
            .inner
            .client
            .request(request.method.clone(), &url)
            .headers(request.headers.clone());
        if let Some(token) = token {
            builder = builder.bearer_auth(token.expose_secret());
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        let response = builder.send().await?;
        let status = response.status();
        let content_type = response.headers().get(CONTENT_TYPE).cloned();
        let body = response.bytes().await?;

        tracing::debug!(status = %status, bytes = body.len(), "Backend responded");

        Ok(BackendResponse {
            status,
            content_type,
            body,
        })
    }

    /// Check that the backend answers HTTP at all.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is not configured or unreachable.
    pub async fn ping(&self) -> Result<StatusCode, BackendError> {
        let url = self.url("/", None)?;
        let response = self.inner.client.get(&url).send().await?;
        Ok(response.status())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn client(base: Option<&str>) -> BackendClient {
        BackendClient::new(&BackendConfig {
            api_url: base.map(String::from),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[test]
    fn test_url_joins_path_and_query() {
        let backend = client(Some("http://localhost:8081/api/v1"));
        assert_eq!(
            backend.url("/orders/12", Some("page=2")).unwrap(),
            "http://localhost:8081/api/v1/orders/12?page=2"
        );
        assert_eq!(
            backend.url("auth/me", Some("")).unwrap(),
            "http://localhost:8081/api/v1/auth/me"
        );
    }

    #[test]
    fn test_url_without_base_is_not_configured() {
        let backend = client(None);
        assert!(!backend.is_configured());
        assert!(matches!(
            backend.url("/orders", None),
            Err(BackendError::NotConfigured)
        ));
    }

    #[test]
    fn test_forwarded_headers_drop_credentials() {
        let mut inbound = HeaderMap::new();
        inbound.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        inbound.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("vi"));
        inbound.insert("cookie", HeaderValue::from_static("sessionToken=abc"));
        inbound.insert("authorization", HeaderValue::from_static("Bearer spoofed"));
        inbound.insert(REQUEST_ID_HEADER, HeaderValue::from_static("req-1"));

        let forwarded = forwarded_headers(&inbound);
        assert_eq!(forwarded.len(), 3);
        assert!(forwarded.get("cookie").is_none());
        assert!(forwarded.get("authorization").is_none());
        assert_eq!(forwarded.get(REQUEST_ID_HEADER).unwrap(), "req-1");
    }

    #[test]
    fn test_declares_json() {
        let mut response = BackendResponse {
            status: StatusCode::OK,
            content_type: Some(HeaderValue::from_static("application/json; charset=utf-8")),
            body: Bytes::from_static(b"{}"),
        };
        assert!(response.declares_json());
        response.content_type = Some(HeaderValue::from_static("text/csv"));
        assert!(!response.declares_json());
        response.content_type = None;
        assert!(response.declares_json());
    }
}
