//! Route guard for page navigation.
//!
//! Runs in front of the static frontend. Every page path carries a locale
//! prefix and falls in one of four areas:
//!
//! | Area    | Paths                         | Rule                            |
//! |---------|-------------------------------|---------------------------------|
//! | Admin   | `/{l}/admin/*`                | ADMIN or STAFF principal        |
//! | Private | `/{l}/me`, `/{l}/me/*`        | session cookie present          |
//! | Public  | `/{l}/login`, `/{l}/register` | signed-in users go to `/{l}/me` |
//! | Other   | everything else               | pass                            |
//!
//! Locale and legacy-path redirects happen before any authentication check.
//! The guard fails closed: any doubt about an admin principal ends at the
//! login page with a `reason`.

mod classify;

pub use classify::{Area, Decision, classify};

use axum::{
    extract::{Request, State},
    http::Uri,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use url::form_urlencoded;

use crate::error::set_sentry_user;
use crate::models::{CookieUpdate, SessionCookies, session::cookie_jar};
use crate::state::AppState;

/// Query parameters dropped when a signed-in user is sent away from the
/// login page.
const LOGIN_PARAMS: &[&str] = &["from", "reason", "redirect"];

/// Route guard middleware.
pub async fn route_guard(
    State(state): State<AppState>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    let decision = classify(
        request.uri().path(),
        request.uri().query(),
        &state.config().locales,
    );

    let (locale, area) = match decision {
        Decision::Skip => return next.run(request).await,
        Decision::Redirect(target) => {
            tracing::debug!(from = %request.uri(), to = %target, "Locale redirect");
            return Redirect::temporary(&target).into_response();
        }
        Decision::Page { locale, area } => (locale, area),
    };

    let session = SessionCookies::from_jar(&jar);
    let original = original_target(request.uri());

    match area {
        Area::Other => next.run(request).await,
        Area::Private => {
            if session.has_session() {
                next.run(request).await
            } else {
                login_redirect(&locale, &original, &[("reason", "login_required".into())])
            }
        }
        Area::Public => {
            if !session.has_session() {
                return next.run(request).await;
            }
            let identity = state.proxy().identify(&session, request.headers()).await;
            let response = if identity.principal().is_some() {
                Redirect::temporary(&account_target(&locale, request.uri().query()))
                    .into_response()
            } else {
                next.run(request).await
            };
            attach(response, identity.cookies.as_ref(), &state)
        }
        Area::Admin => {
            if !session.has_session() {
                return login_redirect(
                    &locale,
                    &original,
                    &[("reason", "login_required".into())],
                );
            }
            let identity = state.proxy().identify(&session, request.headers()).await;
            let response = match &identity.outcome {
                Err(reason) => {
                    tracing::info!(reason = reason.code(), path = %original, "Admin access denied");
                    login_redirect(&locale, &original, &reason.query_pairs())
                }
                Ok(principal) if !principal.role.can_access_admin() => {
                    tracing::info!(
                        role = %principal.role,
                        path = %original,
                        "Admin access refused for role"
                    );
                    Redirect::temporary(&format!("/{locale}/me?unauthorized=1")).into_response()
                }
                Ok(principal) => {
                    set_sentry_user(&principal.id, Some(principal.email.as_str()));
                    next.run(request).await
                }
            };
            attach(response, identity.cookies.as_ref(), &state)
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Path plus query, as the user asked for it.
fn original_target(uri: &Uri) -> String {
    uri.path_and_query()
        .map_or_else(|| uri.path().to_string(), ToString::to_string)
}

/// Redirect to the login page of `locale`.
fn login_redirect(locale: &str, original: &str, reason: &[(&'static str, String)]) -> Response {
    let mut query = form_urlencoded::Serializer::new(String::new());
    for (key, value) in reason {
        query.append_pair(key, value);
    }
    query.append_pair("redirect", original);
    Redirect::temporary(&format!("/{locale}/login?{}", query.finish())).into_response()
}

/// `/{locale}/me` with the login-flow parameters removed.
fn account_target(locale: &str, query: Option<&str>) -> String {
    let kept: Vec<(String, String)> = form_urlencoded::parse(query.unwrap_or_default().as_bytes())
        .filter(|(key, _)| !LOGIN_PARAMS.contains(&key.as_ref()))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    if kept.is_empty() {
        return format!("/{locale}/me");
    }
    let query = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(kept)
        .finish();
    format!("/{locale}/me?{query}")
}

/// Add cookie changes from an identity check to a response.
fn attach(response: Response, update: Option<&CookieUpdate>, state: &AppState) -> Response {
    match update {
        Some(update) => {
            (cookie_jar(Some(update), &state.config().cookies), response).into_response()
        }
        None => response,
    }
}
