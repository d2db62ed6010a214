//! Emporium Core - Shared types library.
//!
//! This crate provides the domain types used by the Emporium web gateway:
//! - `web` - Storefront and admin console gateway in front of the backend API
//! - `integration-tests` - End-to-end checks against a fake backend
//!
//! # Architecture
//!
//! The core crate contains only types and decoding rules - no I/O, no HTTP
//! clients. The backend is the source of truth for every entity described
//! here; these types only give its JSON payloads a checked shape.
//!
//! # Modules
//!
//! - [`types`] - Principals, roles, order events and response envelopes

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
