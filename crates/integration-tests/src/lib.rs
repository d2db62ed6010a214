//! Integration test harness for the Emporium web gateway.
//!
//! Each test starts two servers on ephemeral ports:
//!
//! - a fake backend, an axum router that answers the handful of backend
//!   endpoints the gateway relies on and counts every call it receives
//! - the real gateway router, configured to talk to that backend
//!
//! Requests go over TCP with `reqwest`. Redirects are not followed so tests
//! can assert on `Location`, and cookies are sent by hand.
//!
//! # Fake backend accounts
//!
//! | Session token    | Result of `/auth/me`          |
//! |------------------|-------------------------------|
//! | `admin-token`    | ADMIN                         |
//! | `staff-token`    | STAFF                         |
//! | `customer-token` | CUSTOMER                      |
//! | `valid123`       | CUSTOMER                      |
//! | `fresh-session`  | ADMIN (issued by refresh)     |
//! | `mongo-token`    | ADMIN, with `_id` and `name`  |
//! | `broken-token`   | 500                           |
//! | anything else    | 401                           |
//!
//! The refresh token `good-refresh` is exchanged for `fresh-session` and
//! `rotated-refresh`; every other refresh token is rejected with 401.
//!
//! Login accepts the password `correct horse`. The password `mongo horse`
//! logs in too, with each token repeated under its alias keys.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Request, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    middleware::Next,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use emporium_web::config::GatewayConfig;
use emporium_web::state::AppState;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tower::ServiceExt;

/// Refresh token the fake backend accepts.
pub const GOOD_REFRESH: &str = "good-refresh";

/// Session token issued by a successful refresh.
pub const FRESH_SESSION: &str = "fresh-session";

/// Exact body of the fake `GET /account/me`.
pub const ACCOUNT_BODY: &str = r#"{"success":true,"data":{"id":1,"email":"c@shop.example"}}"#;

// =============================================================================
// Fake backend
// =============================================================================

/// What the fake backend has seen.
#[derive(Default)]
pub struct BackendLog {
    calls: AtomicUsize,
    refresh_calls: AtomicUsize,
    order_tokens: Mutex<Vec<String>>,
}

impl BackendLog {
    /// Every request, whatever the path.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Requests to `/auth/refresh`.
    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    /// Bearer tokens presented to `GET /orders`, in arrival order.
    pub fn order_tokens(&self) -> Vec<String> {
        self.order_tokens.lock().unwrap().clone()
    }
}

/// A running fake backend.
pub struct FakeBackend {
    pub addr: SocketAddr,
    pub log: Arc<BackendLog>,
}

impl FakeBackend {
    /// Start the fake backend on an ephemeral port.
    pub async fn start() -> Self {
        let log = Arc::new(BackendLog::default());

        let api = Router::new()
            .route("/auth/me", get(me))
            .route("/auth/refresh", post(refresh))
            .route("/auth/login", post(login))
            .route("/auth/logout", post(|| async { Json(json!({"success": true})) }))
            .route("/account/me", get(account))
            .route("/orders", get(list_orders).post(create_order))
            .route("/products", get(|| async { Json(json!([{"id": 1}, {"id": 2}])) }))
            .route("/analytics/export", get(export));

        let app = Router::new()
            .route("/", get(|| async { "backend" }))
            .nest("/api/v1", api)
            .layer(axum::middleware::from_fn_with_state(log.clone(), count))
            .with_state(log.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, log }
    }

    /// Base URL the gateway should use.
    pub fn api_url(&self) -> String {
        format!("http://{}/api/v1", self.addr)
    }
}

async fn count(State(log): State<Arc<BackendLog>>, request: Request, next: Next) -> Response {
    log.calls.fetch_add(1, Ordering::SeqCst);
    next.run(request).await
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(String::from)
}

fn role_for(token: &str) -> Option<&'static str> {
    match token {
        "admin-token" | "mongo-token" | FRESH_SESSION => Some("ADMIN"),
        "staff-token" => Some("STAFF"),
        "customer-token" | "valid123" => Some("CUSTOMER"),
        _ => None,
    }
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"success": false, "message": "Token expired"})),
    )
        .into_response()
}

async fn me(headers: HeaderMap) -> Response {
    let token = bearer(&headers).unwrap_or_default();
    if token == "broken-token" {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    let Some(role) = role_for(&token) else {
        return unauthorized();
    };
    let mut user = json!({
        "id": format!("user-{}", role.to_ascii_lowercase()),
        "email": format!("{}@shop.example", role.to_ascii_lowercase()),
        "role": role,
        "fullName": "Test User",
        "isEmailVerified": true
    });
    if token == "mongo-token" {
        user["_id"] = user["id"].clone();
        user["name"] = json!("test.user");
    }
    Json(json!({"success": true, "data": {"user": user}})).into_response()
}

async fn refresh(State(log): State<Arc<BackendLog>>, Json(body): Json<Value>) -> Response {
    log.refresh_calls.fetch_add(1, Ordering::SeqCst);
    // Long enough for concurrent callers to overlap
    tokio::time::sleep(Duration::from_millis(100)).await;

    if body["refreshToken"] == GOOD_REFRESH {
        Json(json!({
            "success": true,
            "data": {
                "accessToken": FRESH_SESSION,
                "refreshToken": "rotated-refresh",
                "expiresIn": 900
            }
        }))
        .into_response()
    } else {
        unauthorized()
    }
}

async fn login(Json(body): Json<Value>) -> Response {
    let user = json!({"id": "user-admin", "email": "admin@shop.example", "role": "ADMIN"});
    match body["password"].as_str() {
        Some("correct horse") => Json(json!({
            "success": true,
            "data": {
                "user": user,
                "accessToken": "admin-token",
                "refreshToken": "login-refresh",
                "expiresIn": 900
            }
        }))
        .into_response(),
        Some("mongo horse") => Json(json!({
            "success": true,
            "data": {
                "user": user,
                "accessToken": "mongo-token",
                "access_token": "mongo-token",
                "token": "mongo-token",
                "refreshToken": "mongo-refresh",
                "refresh_token": "mongo-refresh",
                "expiresIn": 900,
                "expires_in": 900
            }
        }))
        .into_response(),
        _ => unauthorized(),
    }
}

async fn account(headers: HeaderMap) -> Response {
    match bearer(&headers).as_deref().and_then(role_for) {
        Some(_) => ([("content-type", "application/json")], ACCOUNT_BODY).into_response(),
        None => unauthorized(),
    }
}

async fn list_orders(State(log): State<Arc<BackendLog>>, headers: HeaderMap) -> Response {
    let token = bearer(&headers).unwrap_or_default();
    log.order_tokens.lock().unwrap().push(token.clone());
    match role_for(&token) {
        Some(_) => Json(json!({"success": true, "data": []})).into_response(),
        None => unauthorized(),
    }
}

async fn create_order(headers: HeaderMap) -> Response {
    match bearer(&headers).as_deref().and_then(role_for) {
        Some(_) => (
            StatusCode::CREATED,
            Json(json!({"success": true, "data": {"id": "ord_1001"}})),
        )
            .into_response(),
        None => unauthorized(),
    }
}

async fn export(headers: HeaderMap) -> Response {
    match bearer(&headers).as_deref().and_then(role_for) {
        Some(_) => ([("content-type", "text/csv")], "id,total\n1,9.50\n").into_response(),
        None => unauthorized(),
    }
}

// =============================================================================
// Gateway
// =============================================================================

/// Body of the frontend `index.html` served by the gateway.
pub const INDEX_HTML: &str = "<!doctype html><title>Emporium</title>";

/// A built frontend in a temporary directory, removed on drop.
struct StaticDir(PathBuf);

impl StaticDir {
    fn create() -> Self {
        let dir = std::env::temp_dir().join(format!("emporium-it-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("index.html"), INDEX_HTML).unwrap();
        Self(dir)
    }
}

impl Drop for StaticDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

/// A running gateway in front of a fake backend.
pub struct TestContext {
    pub client: reqwest::Client,
    pub base_url: String,
    pub backend: FakeBackend,
    pub state: AppState,
    _static_dir: StaticDir,
}

impl TestContext {
    /// Start a backend and a gateway with default settings.
    pub async fn start() -> Self {
        Self::start_with(&[]).await
    }

    /// Start with extra configuration; entries override the defaults.
    pub async fn start_with(overrides: &[(&str, &str)]) -> Self {
        let backend = FakeBackend::start().await;
        let static_dir = StaticDir::create();

        let mut vars: HashMap<String, String> = HashMap::from([
            ("BACKEND_API_URL".to_string(), backend.api_url()),
            ("STATIC_DIR".to_string(), static_dir.0.display().to_string()),
            ("DEFAULT_LOCALE".to_string(), "en".to_string()),
            ("SUPPORTED_LOCALES".to_string(), "en,vi".to_string()),
        ]);
        for (key, value) in overrides {
            vars.insert((*key).to_string(), (*value).to_string());
        }
        let config = GatewayConfig::from_lookup(|key| vars.get(key).cloned()).unwrap();

        let state = AppState::new(config).unwrap();
        let app = emporium_web::app(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap();

        Self {
            client,
            base_url: format!("http://{addr}"),
            backend,
            state,
            _static_dir: static_dir,
        }
    }

    /// Absolute gateway URL for `path`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// `GET` with an optional `Cookie` header.
    pub async fn get(&self, path: &str, cookies: Option<&str>) -> reqwest::Response {
        let mut request = self.client.get(self.url(path));
        if let Some(cookies) = cookies {
            request = request.header("cookie", cookies);
        }
        request.send().await.unwrap()
    }

    /// Send `request` straight into the gateway router.
    ///
    /// `reqwest` resolves dot segments before sending, so paths that must
    /// reach the gateway unnormalized go through here.
    pub async fn send_raw(&self, request: Request) -> Response {
        emporium_web::app(self.state.clone())
            .oneshot(request)
            .await
            .unwrap()
    }

    /// `POST` a JSON body with an optional `Cookie` header.
    pub async fn post_json(
        &self,
        path: &str,
        cookies: Option<&str>,
        body: &Value,
    ) -> reqwest::Response {
        let mut request = self.client.post(self.url(path)).json(body);
        if let Some(cookies) = cookies {
            request = request.header("cookie", cookies);
        }
        request.send().await.unwrap()
    }
}

// =============================================================================
// Assertions
// =============================================================================

/// The `Location` header of a redirect.
pub fn location(response: &reqwest::Response) -> String {
    response
        .headers()
        .get("location")
        .expect("response has no Location header")
        .to_str()
        .unwrap()
        .to_string()
}

/// All `Set-Cookie` headers of a response.
pub fn set_cookies(response: &reqwest::Response) -> Vec<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

/// The `Set-Cookie` header for cookie `name`, if any.
pub fn set_cookie(response: &reqwest::Response, name: &str) -> Option<String> {
    set_cookies(response)
        .into_iter()
        .find(|c| c.starts_with(&format!("{name}=")))
}
