//! Request-scoped models for the gateway.
//!
//! Nothing here is persisted: session credentials live in browser cookies
//! and the backend is the source of truth for everything else.

pub mod navigation;
pub mod session;

pub use navigation::{AdminSection, NavItem};
pub use session::{CookieUpdate, REFRESH_COOKIE, SESSION_COOKIE, SessionCookies};
