//! The authenticated principal returned by the backend identity endpoint.

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::types::email::{Email, EmailError};
use crate::types::envelope::unwrap_data;
use crate::types::id::UserId;
use crate::types::role::Role;

/// Why an identity payload could not be turned into a [`Principal`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrincipalError {
    /// The payload holds no user object (or one without an ID).
    #[error("identity payload contains no user")]
    NoUser,
    /// The user object has no role.
    #[error("user has no role")]
    NoRole,
    /// The user object has no email.
    #[error("user has no email")]
    NoEmail,
    /// The user object has an email that does not parse.
    #[error("user email is invalid: {0}")]
    InvalidEmail(#[from] EmailError),
}

/// A user as seen by the gateway for the lifetime of one request.
///
/// Never stored locally; fetched from the backend whenever a decision
/// depends on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub id: UserId,
    pub email: Email,
    pub role: Role,
    pub full_name: Option<String>,
    pub avatar: Option<String>,
    pub is_email_verified: bool,
}

/// Keys that may carry the user ID, in order of preference.
const ID_KEYS: &[&str] = &["id", "_id"];

/// Keys that may carry the display name, in order of preference.
const NAME_KEYS: &[&str] = &["fullName", "name"];

impl Principal {
    /// Decode the body of the backend `/auth/me` response.
    ///
    /// Accepts `{"data": {"user": {...}}}`, `{"data": {...}}`,
    /// `{"user": {...}}` and a bare user object. Fields are read key by key
    /// so a user that carries both `id` and `_id` still decodes.
    ///
    /// # Errors
    ///
    /// Returns the first missing piece, checked in the order user, role, email.
    pub fn from_identity_body(body: &Value) -> Result<Self, PrincipalError> {
        let payload = unwrap_data(body);
        let user = payload
            .get("user")
            .unwrap_or(payload)
            .as_object()
            .ok_or(PrincipalError::NoUser)?;

        let id = ID_KEYS
            .iter()
            .find_map(|key| serde_json::from_value::<UserId>(user.get(*key)?.clone()).ok())
            .ok_or(PrincipalError::NoUser)?;

        let role = string_field(user, &["role"])
            .and_then(|r| r.parse::<Role>().ok())
            .ok_or(PrincipalError::NoRole)?;

        let email = match string_field(user, &["email"]).map(str::trim) {
            None | Some("") => return Err(PrincipalError::NoEmail),
            Some(email) => Email::parse(email)?,
        };

        Ok(Self {
            id,
            email,
            role,
            full_name: string_field(user, NAME_KEYS).map(String::from),
            avatar: string_field(user, &["avatar"]).map(String::from),
            is_email_verified: user
                .get("isEmailVerified")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        })
    }
}

/// First non-empty string among `keys`.
fn string_field<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|key| object.get(*key)?.as_str().filter(|s| !s.is_empty()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_decode_wrapped_user() {
        let body = json!({
            "success": true,
            "data": {
                "user": {
                    "id": 12,
                    "email": "ops@shop.example",
                    "role": "STAFF",
                    "fullName": "Ops Person",
                    "isEmailVerified": true
                }
            }
        });
        let principal = Principal::from_identity_body(&body).unwrap();
        assert_eq!(principal.id, UserId::new("12"));
        assert_eq!(principal.role, Role::Staff);
        assert_eq!(principal.full_name.as_deref(), Some("Ops Person"));
        assert!(principal.is_email_verified);
    }

    #[test]
    fn test_decode_bare_user() {
        let body = json!({"id": "u1", "email": "c@shop.example", "role": "CUSTOMER"});
        let principal = Principal::from_identity_body(&body).unwrap();
        assert_eq!(principal.role, Role::Customer);
        assert!(!principal.is_email_verified);
    }

    #[test]
    fn test_missing_pieces() {
        assert_eq!(
            Principal::from_identity_body(&json!({"data": null})),
            Err(PrincipalError::NoUser)
        );
        assert_eq!(
            Principal::from_identity_body(&json!({"data": {"email": "x@y.z", "role": "ADMIN"}})),
            Err(PrincipalError::NoUser)
        );
        assert_eq!(
            Principal::from_identity_body(&json!({"data": {"id": 1, "email": "x@y.z"}})),
            Err(PrincipalError::NoRole)
        );
        assert_eq!(
            Principal::from_identity_body(&json!({"data": {"id": 1, "role": "ADMIN"}})),
            Err(PrincipalError::NoEmail)
        );
    }

    #[test]
    fn test_duplicate_keys_decode() {
        let body = json!({
            "data": {
                "user": {
                    "_id": "u1",
                    "id": "u1",
                    "email": "admin@shop.example",
                    "role": "ADMIN",
                    "fullName": "Site Admin",
                    "name": "admin"
                }
            }
        });
        let principal = Principal::from_identity_body(&body).unwrap();
        assert_eq!(principal.id, UserId::new("u1"));
        assert_eq!(principal.role, Role::Admin);
        assert_eq!(principal.full_name.as_deref(), Some("Site Admin"));
    }

    #[test]
    fn test_underscore_id_and_name_fallbacks() {
        let body = json!({
            "_id": "64f0",
            "id": null,
            "email": "a@b.co",
            "role": "STAFF",
            "name": "Al"
        });
        let principal = Principal::from_identity_body(&body).unwrap();
        assert_eq!(principal.id, UserId::new("64f0"));
        assert_eq!(principal.full_name.as_deref(), Some("Al"));
    }

    #[test]
    fn test_serializes_camel_case() {
        let body = json!({"id": 3, "email": "a@b.c", "role": "ADMIN", "avatar": "/a.png"});
        let value = serde_json::to_value(Principal::from_identity_body(&body).unwrap()).unwrap();
        assert_eq!(value["isEmailVerified"], json!(false));
        assert_eq!(value["role"], json!("ADMIN"));
        assert_eq!(value["avatar"], json!("/a.png"));
    }
}
