//! Core types for Emporium.
//!
//! This module provides type-safe wrappers for the payloads exchanged with
//! the backend API.

pub mod email;
pub mod envelope;
pub mod event;
pub mod id;
pub mod principal;
pub mod role;

pub use email::{Email, EmailError};
pub use envelope::{ListPayload, unwrap_data};
pub use event::OrderCreated;
pub use id::*;
pub use principal::{Principal, PrincipalError};
pub use role::Role;
