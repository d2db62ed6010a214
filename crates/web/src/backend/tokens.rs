//! Session tokens issued by the backend login and refresh endpoints.

use secrecy::SecretString;
use serde_json::{Map, Value};

/// Keys that may carry the session token, in order of preference.
const SESSION_KEYS: &[&str] = &["accessToken", "sessionToken", "token", "access_token"];

/// Keys that may carry the refresh token, in order of preference.
const REFRESH_KEYS: &[&str] = &["refreshToken", "refresh_token"];

/// Keys that may carry the session lifetime in seconds.
const EXPIRES_KEYS: &[&str] = &["expiresIn", "expires_in"];

/// A session token with its optional rotated refresh token.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub session_token: SecretString,
    /// Present only when the backend rotated the refresh token.
    pub refresh_token: Option<SecretString>,
    /// Session token lifetime in seconds, when the backend states it.
    pub expires_in: Option<i64>,
}

impl TokenPair {
    /// Find a token pair in a backend response body.
    ///
    /// Looks at `data.tokens`, `data` and the top level, in that order.
    #[must_use]
    pub fn from_body(body: &Value) -> Option<Self> {
        let data = body.get("data");
        let candidates = [
            data.and_then(|d| d.get("tokens")),
            data,
            body.get("tokens"),
            Some(body),
        ];

        candidates.into_iter().flatten().find_map(|candidate| {
            let object = candidate.as_object()?;
            Some(Self {
                session_token: SecretString::from(first_token(object, SESSION_KEYS)?),
                refresh_token: first_token(object, REFRESH_KEYS).map(SecretString::from),
                expires_in: EXPIRES_KEYS
                    .iter()
                    .find_map(|key| object.get(*key)?.as_i64())
                    .filter(|secs| *secs > 0),
            })
        })
    }
}

/// First non-empty string among `keys`.
fn first_token(object: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        object
            .get(*key)?
            .as_str()
            .filter(|token| !token.is_empty())
            .map(String::from)
    })
}

/// Remove every credential field from a response body in place.
pub fn strip_tokens(body: &mut Value) {
    fn strip_object(value: &mut Value) {
        if let Some(object) = value.as_object_mut() {
            for key in SESSION_KEYS.iter().chain(REFRESH_KEYS) {
                object.remove(*key);
            }
            object.remove("tokens");
        }
    }

    strip_object(body);
    if let Some(data) = body.get_mut("data") {
        strip_object(data);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::ExposeSecret;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_tokens_in_data() {
        let body = json!({
            "success": true,
            "data": {"accessToken": "s1", "refreshToken": "r1", "expiresIn": 900}
        });
        let pair = TokenPair::from_body(&body).unwrap();
        assert_eq!(pair.session_token.expose_secret(), "s1");
        assert_eq!(pair.refresh_token.unwrap().expose_secret(), "r1");
        assert_eq!(pair.expires_in, Some(900));
    }

    #[test]
    fn test_tokens_nested_and_aliased() {
        let body = json!({"data": {"user": {"id": 1}, "tokens": {"sessionToken": "s2"}}});
        let pair = TokenPair::from_body(&body).unwrap();
        assert_eq!(pair.session_token.expose_secret(), "s2");
        assert!(pair.refresh_token.is_none());

        let flat = json!({"access_token": "s3", "expires_in": 0});
        let pair = TokenPair::from_body(&flat).unwrap();
        assert_eq!(pair.session_token.expose_secret(), "s3");
        assert_eq!(pair.expires_in, None);
    }

    #[test]
    fn test_name_and_alias_both_present() {
        let body = json!({
            "data": {
                "accessToken": "s4",
                "token": "s4",
                "refreshToken": "r4",
                "refresh_token": "r4",
                "expiresIn": 600,
                "expires_in": 600
            }
        });
        let pair = TokenPair::from_body(&body).unwrap();
        assert_eq!(pair.session_token.expose_secret(), "s4");
        assert_eq!(pair.refresh_token.unwrap().expose_secret(), "r4");
        assert_eq!(pair.expires_in, Some(600));
    }

    #[test]
    fn test_empty_preferred_key_falls_through() {
        let body = json!({"accessToken": "", "sessionToken": "s5"});
        let pair = TokenPair::from_body(&body).unwrap();
        assert_eq!(pair.session_token.expose_secret(), "s5");
    }

    #[test]
    fn test_no_tokens() {
        assert!(TokenPair::from_body(&json!({"data": {"user": {"id": 1}}})).is_none());
        assert!(TokenPair::from_body(&json!({"data": {"accessToken": ""}})).is_none());
        assert!(TokenPair::from_body(&json!(null)).is_none());
    }

    #[test]
    fn test_strip_tokens() {
        let mut body = json!({
            "success": true,
            "token": "top",
            "data": {"accessToken": "a", "refreshToken": "r", "tokens": {}, "user": {"id": 1}}
        });
        strip_tokens(&mut body);
        assert_eq!(body, json!({"success": true, "data": {"user": {"id": 1}}}));
    }
}
