//! Application state shared across handlers.

use std::sync::Arc;

use crate::backend::{BackendClient, BackendError};
use crate::config::GatewayConfig;
use crate::services::{AuthProxy, NotificationHub};

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: GatewayConfig,
    backend: BackendClient,
    proxy: AuthProxy,
    notifications: NotificationHub,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend HTTP client cannot be built.
    pub fn new(config: GatewayConfig) -> Result<Self, BackendError> {
        let backend = BackendClient::new(&config.backend)?;
        let proxy = AuthProxy::new(backend.clone(), config.cookies);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                backend,
                proxy,
                notifications: NotificationHub::new(),
            }),
        })
    }

    /// Get a reference to the gateway configuration.
    #[must_use]
    pub fn config(&self) -> &GatewayConfig {
        &self.inner.config
    }

    /// Get a reference to the backend client.
    #[must_use]
    pub fn backend(&self) -> &BackendClient {
        &self.inner.backend
    }

    /// Get a reference to the auth proxy.
    #[must_use]
    pub fn proxy(&self) -> &AuthProxy {
        &self.inner.proxy
    }

    /// Get a reference to the order notification hub.
    #[must_use]
    pub fn notifications(&self) -> &NotificationHub {
        &self.inner.notifications
    }
}
