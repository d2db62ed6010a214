//! Unified error handling with Sentry integration.
//!
//! Route handlers that do more than relay a backend response return
//! `Result<T, AppError>`. Server errors are captured to Sentry before the
//! response goes out; clients only ever see a generic message.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::backend::BackendError;
use crate::services::{AuthError, DenyReason};

/// Application-level error type for the gateway.
#[derive(Debug, Error)]
pub enum AppError {
    /// Backend call failed.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Session refresh or identity check failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User is authenticated but may not do this.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DenyReason> for AppError {
    fn from(reason: DenyReason) -> Self {
        match reason {
            DenyReason::LoginRequired
            | DenyReason::NoUser
            | DenyReason::NoRole
            | DenyReason::NoEmail => Self::Unauthorized(reason.code().to_string()),
            DenyReason::Forbidden => Self::Forbidden(reason.code().to_string()),
            DenyReason::ApiError(status) => {
                Self::Internal(format!("identity check returned {status}"))
            }
            DenyReason::ParseError => Self::Internal("identity response was not JSON".into()),
            DenyReason::Error(message) => Self::Internal(message),
        }
    }
}

impl AppError {
    const fn status(&self) -> StatusCode {
        match self {
            Self::Backend(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Auth(err) => match err {
                AuthError::MissingRefreshToken | AuthError::MalformedTokens => {
                    StatusCode::UNAUTHORIZED
                }
                AuthError::RefreshRejected(status) => *status,
                AuthError::Upstream(_) | AuthError::NotConfigured => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Backend(BackendError::NotConfigured) | Self::Auth(AuthError::NotConfigured) => {
                "Backend API is not configured".to_string()
            }
            Self::Backend(_) | Self::Internal(_) | Self::Auth(AuthError::Upstream(_)) => {
                "Internal server error".to_string()
            }
            Self::Auth(AuthError::RefreshRejected(_)) => "Session expired".to_string(),
            Self::Auth(_) => "Authentication required".to_string(),
            Self::NotFound(_) => "Not found".to_string(),
            Self::Unauthorized(_) => "Unauthorized".to_string(),
            Self::Forbidden(_) => "Forbidden".to_string(),
        };

        (status, Json(json!({"success": false, "message": message}))).into_response()
    }
}

/// Set the Sentry user context for the current request.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;
    use serde_json::Value;

    use super::*;

    async fn body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_deny_reasons_map_to_statuses() {
        assert_eq!(
            AppError::from(DenyReason::LoginRequired).into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::from(DenyReason::NoRole).into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::from(DenyReason::Forbidden).into_response().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::from(DenyReason::ApiError(StatusCode::BAD_GATEWAY))
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_internal_details_are_hidden() {
        let response = AppError::Internal("db password wrong".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Internal server error");
    }

    #[tokio::test]
    async fn test_refresh_rejection_keeps_backend_status() {
        let response =
            AppError::Auth(AuthError::RefreshRejected(StatusCode::FORBIDDEN)).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body(response).await["message"], "Session expired");
    }

    #[tokio::test]
    async fn test_not_configured_message() {
        let response = AppError::Backend(BackendError::NotConfigured).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body(response).await["message"],
            "Backend API is not configured"
        );
    }
}
