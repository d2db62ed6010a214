//! Backend response envelopes.
//!
//! The backend is not consistent about wrapping: a single resource may come
//! back as `{"success": true, "data": {...}}` or as the bare object, and a
//! collection as `{"data": [...]}`, `{"data": {"items": [...]}}` or a bare
//! array. [`unwrap_data`] and [`ListPayload`] turn that into one decode step
//! with explicit fallbacks.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// A collection payload in any of the shapes the backend produces.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ListPayload<T> {
    /// `[T, ...]`
    Bare(Vec<T>),
    /// `{"data": [T, ...]}`
    Wrapped {
        /// The wrapped items.
        data: Vec<T>,
    },
    /// `{"data": {"items": [T, ...]}}`
    Paged {
        /// The page object holding the items.
        data: Page<T>,
    },
}

/// Inner page object of a paged list response.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    /// Items on this page.
    pub items: Vec<T>,
}

impl<T: DeserializeOwned> ListPayload<T> {
    /// Decode a list from any supported shape.
    ///
    /// Anything that is not one of the known shapes (including `null`,
    /// error bodies and items of the wrong type) yields an empty list.
    #[must_use]
    pub fn decode(value: Value) -> Vec<T> {
        match serde_json::from_value::<Self>(value) {
            Ok(Self::Bare(items) | Self::Wrapped { data: items }) => items,
            Ok(Self::Paged { data }) => data.items,
            Err(_) => Vec::new(),
        }
    }
}

/// Borrow the `data` member of an object if present, otherwise the value itself.
#[must_use]
pub fn unwrap_data(value: &Value) -> &Value {
    value.get("data").unwrap_or(value)
}
