//! Identity checks against the backend `/auth/me` endpoint.

use axum::http::StatusCode;
use emporium_core::{Principal, PrincipalError};

use crate::backend::BackendResponse;
use crate::models::CookieUpdate;

/// Backend path that describes the current session's user.
pub const IDENTITY_PATH: &str = "/auth/me";

/// Why an identity check did not produce a principal.
///
/// Each reason travels to the login page as the `reason` query parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    /// No session, or the backend answered 401.
    LoginRequired,
    /// The backend answered 403.
    Forbidden,
    /// Any other non-success status.
    ApiError(StatusCode),
    /// The body was not JSON.
    ParseError,
    /// The body carried no user object.
    NoUser,
    /// The user has no role.
    NoRole,
    /// The user has no (valid) email.
    NoEmail,
    /// The backend could not be reached.
    Error(String),
}

impl DenyReason {
    /// Value of the `reason` query parameter.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::LoginRequired => "login_required",
            Self::Forbidden => "forbidden",
            Self::ApiError(_) => "api_error",
            Self::ParseError => "parse_error",
            Self::NoUser => "no_user",
            Self::NoRole => "no_role",
            Self::NoEmail => "no_email",
            Self::Error(_) => "error",
        }
    }

    /// Query parameters describing this reason on a login redirect.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("reason", self.code().to_string())];
        match self {
            Self::ApiError(status) => pairs.push(("status", status.as_u16().to_string())),
            Self::Error(message) => pairs.push(("error", message.clone())),
            _ => {}
        }
        pairs
    }

    /// Map a backend identity response to a principal.
    pub(super) fn check(response: &BackendResponse) -> Result<Principal, Self> {
        match response.status {
            StatusCode::UNAUTHORIZED => return Err(Self::LoginRequired),
            StatusCode::FORBIDDEN => return Err(Self::Forbidden),
            status if !status.is_success() => return Err(Self::ApiError(status)),
            _ => {}
        }

        let body = response.json().ok_or(Self::ParseError)?;
        Principal::from_identity_body(&body).map_err(Self::from)
    }
}

impl From<PrincipalError> for DenyReason {
    fn from(err: PrincipalError) -> Self {
        match err {
            PrincipalError::NoUser => Self::NoUser,
            PrincipalError::NoRole => Self::NoRole,
            PrincipalError::NoEmail | PrincipalError::InvalidEmail(_) => Self::NoEmail,
        }
    }
}

/// Result of an identity check.
#[derive(Debug)]
pub struct Identity {
    pub outcome: Result<Principal, DenyReason>,
    /// Cookie change caused by a refresh during the check.
    pub cookies: Option<CookieUpdate>,
}

impl Identity {
    /// The principal, if the check succeeded.
    #[must_use]
    pub fn principal(&self) -> Option<&Principal> {
        self.outcome.as_ref().ok()
    }
}
