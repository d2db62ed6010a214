//! Gateway configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional; defaults target a local development stack.
//!
//! - `GATEWAY_HOST` - Bind address (default: 127.0.0.1)
//! - `GATEWAY_PORT` - Listen port (default: 3000)
//! - `PUBLIC_SITE_URL` - Public URL of the site (default: <http://localhost:3000>)
//! - `APP_ENV` - `production` enables `Secure` cookies
//! - `BACKEND_API_URL` - Full backend base URL; overrides the next two.
//!   Set it to an empty string to run without a backend (every proxy call
//!   then answers 500 "not configured").
//! - `BACKEND_URL` - Backend origin (default: <http://localhost:8081>)
//! - `API_VERSION` - Backend API version segment (default: v1)
//! - `BACKEND_TIMEOUT_SECS` - Backend request timeout (default: 30)
//! - `DEFAULT_LOCALE` - Locale used for unprefixed paths (default: en)
//! - `SUPPORTED_LOCALES` - Comma separated locale list (default: en)
//! - `SESSION_COOKIE_MAX_AGE_SECS` - `sessionToken` lifetime when the backend
//!   does not send `expiresIn` (default: 3600)
//! - `REFRESH_COOKIE_MAX_AGE_SECS` - `refreshToken` lifetime (default: 604800)
//! - `STATIC_DIR` - Built frontend bundle (default: web/dist)
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`,
//!   `SENTRY_TRACES_SAMPLE_RATE` - Error tracking

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const DEFAULT_BACKEND_URL: &str = "http://localhost:8081";
const DEFAULT_API_VERSION: &str = "v1";
const DEFAULT_SESSION_MAX_AGE_SECS: i64 = 60 * 60;
const DEFAULT_REFRESH_MAX_AGE_SECS: i64 = 7 * 24 * 60 * 60;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Gateway application configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL of the site
    pub site_url: Url,
    /// Whether this is a production deployment
    pub production: bool,
    /// Backend API access
    pub backend: BackendConfig,
    /// Locale prefixes for page routes
    pub locales: LocaleConfig,
    /// Session cookie attributes
    pub cookies: CookieConfig,
    /// Directory holding the built frontend
    pub static_dir: PathBuf,
    /// Sentry error tracking
    pub sentry: SentryConfig,
}

/// Backend API configuration.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Base URL every backend path is appended to, without a trailing slash.
    /// `None` when explicitly disabled.
    pub api_url: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
}

/// Supported locale prefixes.
#[derive(Debug, Clone)]
pub struct LocaleConfig {
    /// Locale used when a path carries none.
    pub default: String,
    /// Every locale accepted as a first path segment.
    pub supported: Vec<String>,
}

impl LocaleConfig {
    /// Whether `segment` is one of the supported locales.
    #[must_use]
    pub fn is_supported(&self, segment: &str) -> bool {
        self.supported.iter().any(|l| l == segment)
    }
}

/// Attributes applied to the session cookies.
#[derive(Debug, Clone, Copy)]
pub struct CookieConfig {
    /// Set the `Secure` attribute.
    pub secure: bool,
    /// Fallback `Max-Age` of `sessionToken`, in seconds.
    pub session_max_age: i64,
    /// `Max-Age` of `refreshToken`, in seconds.
    pub refresh_max_age: i64,
}

/// Sentry client options.
#[derive(Debug, Clone, Default)]
pub struct SentryConfig {
    pub dsn: Option<SecretString>,
    pub environment: Option<String>,
    pub sample_rate: f32,
    pub traces_sample_rate: f32,
}

impl GatewayConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = parse_or_default(&lookup, "GATEWAY_HOST", "127.0.0.1".parse().ok())?;
        let port = parse_or_default(&lookup, "GATEWAY_PORT", Some(3000))?;

        let site_url = or_default(&lookup, "PUBLIC_SITE_URL", "http://localhost:3000");
        let site_url = Url::parse(&site_url)
            .map_err(|e| ConfigError::InvalidEnvVar("PUBLIC_SITE_URL".to_string(), e.to_string()))?;

        let production = lookup("APP_ENV").is_some_and(|v| v.eq_ignore_ascii_case("production"));

        let backend = BackendConfig {
            api_url: backend_api_url(&lookup)?,
            timeout: Duration::from_secs(parse_or_default(
                &lookup,
                "BACKEND_TIMEOUT_SECS",
                Some(30_u64),
            )?),
        };

        let locales = locale_config(&lookup)?;

        let cookies = CookieConfig {
            secure: production || site_url.scheme() == "https",
            session_max_age: parse_or_default(
                &lookup,
                "SESSION_COOKIE_MAX_AGE_SECS",
                Some(DEFAULT_SESSION_MAX_AGE_SECS),
            )?,
            refresh_max_age: parse_or_default(
                &lookup,
                "REFRESH_COOKIE_MAX_AGE_SECS",
                Some(DEFAULT_REFRESH_MAX_AGE_SECS),
            )?,
        };

        let static_dir = PathBuf::from(or_default(&lookup, "STATIC_DIR", "web/dist"));

        let sentry = SentryConfig {
            dsn: non_empty(&lookup, "SENTRY_DSN").map(SecretString::from),
            environment: non_empty(&lookup, "SENTRY_ENVIRONMENT"),
            sample_rate: parse_or_default(&lookup, "SENTRY_SAMPLE_RATE", Some(1.0))?,
            traces_sample_rate: parse_or_default(&lookup, "SENTRY_TRACES_SAMPLE_RATE", Some(0.0))?,
        };

        Ok(Self {
            host,
            port,
            site_url,
            production,
            backend,
            locales,
            cookies,
            static_dir,
            sentry,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a variable, treating empty strings as unset.
fn non_empty<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str) -> Option<String> {
    lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Get a variable with a default value.
fn or_default<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str, default: &str) -> String {
    non_empty(lookup, key).unwrap_or_else(|| default.to_string())
}

/// Parse a variable, falling back to `default` when unset.
fn parse_or_default<F, T>(lookup: &F, key: &str, default: Option<T>) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match non_empty(lookup, key) {
        Some(raw) => raw
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        None => {
            default.ok_or_else(|| ConfigError::InvalidEnvVar(key.to_string(), "missing".into()))
        }
    }
}

/// Resolve the backend base URL.
///
/// `BACKEND_API_URL` wins when present, and an empty value disables the
/// backend. Otherwise `{BACKEND_URL}/api/{API_VERSION}`.
fn backend_api_url<F: Fn(&str) -> Option<String>>(
    lookup: &F,
) -> Result<Option<String>, ConfigError> {
    let (key, candidate) = match lookup("BACKEND_API_URL") {
        Some(explicit) if explicit.trim().is_empty() => return Ok(None),
        Some(explicit) => ("BACKEND_API_URL", explicit.trim().to_string()),
        None => {
            let origin = or_default(lookup, "BACKEND_URL", DEFAULT_BACKEND_URL);
            let version = or_default(lookup, "API_VERSION", DEFAULT_API_VERSION);
            (
                "BACKEND_URL",
                format!(
                    "{}/api/{}",
                    origin.trim_end_matches('/'),
                    version.trim_matches('/')
                ),
            )
        }
    };

    let url = Url::parse(&candidate)
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }

    Ok(Some(candidate.trim_end_matches('/').to_string()))
}

/// Build the locale configuration and check the default is supported.
fn locale_config<F: Fn(&str) -> Option<String>>(lookup: &F) -> Result<LocaleConfig, ConfigError> {
    let default = or_default(lookup, "DEFAULT_LOCALE", "en");
    let supported: Vec<String> = or_default(lookup, "SUPPORTED_LOCALES", &default)
        .split(',')
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect();

    if let Some(bad) = supported
        .iter()
        .find(|l| !l.chars().all(|c| c.is_ascii_alphanumeric() || c == '-'))
    {
        return Err(ConfigError::InvalidEnvVar(
            "SUPPORTED_LOCALES".to_string(),
            format!("invalid locale '{bad}'"),
        ));
    }
    if !supported.contains(&default) {
        return Err(ConfigError::InvalidEnvVar(
            "DEFAULT_LOCALE".to_string(),
            format!("'{default}' is not listed in SUPPORTED_LOCALES"),
        ));
    }

    Ok(LocaleConfig { default, supported })
}
