//! Session error types.

use axum::http::StatusCode;
use thiserror::Error;

use crate::backend::BackendError;

/// Errors that can occur while refreshing or checking a session.
///
/// `Clone` so one refresh outcome can be handed to every request that
/// waited on it.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// No `refreshToken` cookie.
    #[error("no refresh token")]
    MissingRefreshToken,

    /// The backend refused the refresh token.
    #[error("refresh rejected with status {0}")]
    RefreshRejected(StatusCode),

    /// The refresh succeeded but carried no usable session token.
    #[error("refresh response carried no session token")]
    MalformedTokens,

    /// The backend could not be reached.
    #[error("backend unreachable: {0}")]
    Upstream(String),

    /// No backend base URL is configured.
    #[error("Backend API is not configured")]
    NotConfigured,
}

impl AuthError {
    /// Whether the session is over and its cookies should be cleared.
    #[must_use]
    pub const fn session_expired(&self) -> bool {
        matches!(self, Self::RefreshRejected(_))
    }
}

impl From<BackendError> for AuthError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::NotConfigured => Self::NotConfigured,
            BackendError::Http(e) => Self::Upstream(e.to_string()),
        }
    }
}
