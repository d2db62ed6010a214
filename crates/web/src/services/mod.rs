//! Services shared by route handlers and middleware.
//!
//! - `auth` - Backend proxy with session refresh and identity checks
//! - `notifications` - Order event fan-out to admin dashboards

pub mod auth;
pub mod notifications;

pub use auth::{AuthError, AuthProxy, DenyReason, Identity, ProxyOutcome, Relay};
pub use notifications::{Frame, HEARTBEAT_INTERVAL, NotificationHub, Subscription};
