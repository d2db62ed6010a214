//! Session credentials carried in browser cookies.
//!
//! Two HTTP-only cookies make up a session:
//! - `sessionToken` - short-lived bearer token, `SameSite=Lax`
//! - `refreshToken` - longer-lived, only ever sent back to this site, `SameSite=Strict`

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use secrecy::{ExposeSecret, SecretString};

use crate::backend::TokenPair;
use crate::config::CookieConfig;

/// Session cookie name.
pub const SESSION_COOKIE: &str = "sessionToken";

/// Refresh cookie name.
pub const REFRESH_COOKIE: &str = "refreshToken";

/// Credentials read from the request cookies.
#[derive(Debug, Clone, Default)]
pub struct SessionCookies {
    pub session_token: Option<SecretString>,
    pub refresh_token: Option<SecretString>,
}

impl SessionCookies {
    /// Read both cookies, ignoring empty values.
    #[must_use]
    pub fn from_jar(jar: &CookieJar) -> Self {
        let read = |name: &str| {
            jar.get(name)
                .map(Cookie::value)
                .filter(|v| !v.is_empty())
                .map(|v| SecretString::from(v.to_owned()))
        };

        Self {
            session_token: read(SESSION_COOKIE),
            refresh_token: read(REFRESH_COOKIE),
        }
    }

    /// Whether a session token is present (validity is not checked).
    #[must_use]
    pub const fn has_session(&self) -> bool {
        self.session_token.is_some()
    }

    /// Neither cookie is present.
    #[must_use]
    pub const fn is_anonymous(&self) -> bool {
        self.session_token.is_none() && self.refresh_token.is_none()
    }
}

/// A change to the session cookies to send back with a response.
#[derive(Debug, Clone)]
pub enum CookieUpdate {
    /// Store freshly issued tokens.
    Rotate(TokenPair),
    /// Clear both cookies; the session is over.
    Expire,
}

impl CookieUpdate {
    /// Add the resulting `Set-Cookie` entries to `jar`.
    #[must_use]
    pub fn apply(&self, jar: CookieJar, policy: &CookieConfig) -> CookieJar {
        match self {
            Self::Rotate(pair) => {
                let session_max_age = pair.expires_in.unwrap_or(policy.session_max_age);
                let jar = jar.add(build(
                    SESSION_COOKIE,
                    pair.session_token.expose_secret().to_owned(),
                    SameSite::Lax,
                    policy.secure,
                    session_max_age,
                ));
                match &pair.refresh_token {
                    Some(refresh) => jar.add(build(
                        REFRESH_COOKIE,
                        refresh.expose_secret().to_owned(),
                        SameSite::Strict,
                        policy.secure,
                        policy.refresh_max_age,
                    )),
                    None => jar,
                }
            }
            Self::Expire => jar
                .add(build(
                    SESSION_COOKIE,
                    String::new(),
                    SameSite::Lax,
                    policy.secure,
                    0,
                ))
                .add(build(
                    REFRESH_COOKIE,
                    String::new(),
                    SameSite::Strict,
                    policy.secure,
                    0,
                )),
        }
    }
}

/// Apply an optional update to a fresh jar.
#[must_use]
pub fn cookie_jar(update: Option<&CookieUpdate>, policy: &CookieConfig) -> CookieJar {
    let jar = CookieJar::new();
    match update {
        Some(update) => update.apply(jar, policy),
        None => jar,
    }
}

fn build(
    name: &'static str,
    value: String,
    same_site: SameSite,
    secure: bool,
    max_age_secs: i64,
) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .same_site(same_site)
        .secure(secure)
        .max_age(time::Duration::seconds(max_age_secs.max(0)))
        .build()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const POLICY: CookieConfig = CookieConfig {
        secure: true,
        session_max_age: 3600,
        refresh_max_age: 604_800,
    };

    fn set_cookies(jar: CookieJar) -> Vec<String> {
        jar.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_from_jar_reads_both_cookies() {
        let jar = CookieJar::new()
            .add(Cookie::new(SESSION_COOKIE, "valid123"))
            .add(Cookie::new(REFRESH_COOKIE, ""));
        let session = SessionCookies::from_jar(&jar);
        assert_eq!(session.session_token.unwrap().expose_secret(), "valid123");
        assert!(session.refresh_token.is_none());
    }

    #[test]
    fn test_anonymous() {
        let session = SessionCookies::from_jar(&CookieJar::new());
        assert!(session.is_anonymous());
        assert!(!session.has_session());
    }

    #[test]
    fn test_rotate_sets_attributes() {
        let pair = TokenPair {
            session_token: SecretString::from("new-session"),
            refresh_token: Some(SecretString::from("new-refresh")),
            expires_in: Some(900),
        };
        let cookies = set_cookies(CookieUpdate::Rotate(pair).apply(CookieJar::new(), &POLICY));
        assert_eq!(cookies.len(), 2);

        let session = cookies.iter().find(|c| c.starts_with("sessionToken=")).unwrap();
        assert!(session.contains("sessionToken=new-session"));
        assert!(session.contains("HttpOnly"));
        assert!(session.contains("SameSite=Lax"));
        assert!(session.contains("Secure"));
        assert!(session.contains("Path=/"));
        assert!(session.contains("Max-Age=900"));

        let refresh = cookies.iter().find(|c| c.starts_with("refreshToken=")).unwrap();
        assert!(refresh.contains("SameSite=Strict"));
        assert!(refresh.contains("Max-Age=604800"));
    }

    #[test]
    fn test_rotate_without_new_refresh_keeps_existing_cookie() {
        let pair = TokenPair {
            session_token: SecretString::from("s"),
            refresh_token: None,
            expires_in: None,
        };
        let cookies = set_cookies(CookieUpdate::Rotate(pair).apply(CookieJar::new(), &POLICY));
        assert_eq!(cookies.len(), 1);
        assert!(cookies[0].contains("Max-Age=3600"));
    }

    #[test]
    fn test_expire_clears_both() {
        let cookies = set_cookies(cookie_jar(Some(&CookieUpdate::Expire), &POLICY));
        assert_eq!(cookies.len(), 2);
        assert!(cookies.iter().all(|c| c.contains("Max-Age=0")));
    }
}
