//! HTTP middleware stack for the gateway.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request span)
//! 3. Request ID (reuse or generate `x-request-id`)
//! 4. Security headers
//! 5. Route guard (locale prefix, page authentication)

pub mod guard;
pub mod request_id;
pub mod security_headers;

pub use guard::route_guard;
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
