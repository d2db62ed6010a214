//! Session refresh with single flight.
//!
//! A page load fires several API calls at once. When the session token has
//! just expired they all get a 401 together, and each would present the same
//! refresh token. The backend rotates refresh tokens, so only the first
//! exchange would succeed. The coordinator runs one exchange per refresh
//! token and hands its result to every caller that arrives while it is in
//! flight or shortly after.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use moka::future::Cache;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use sha2::{Digest, Sha256};
use tracing::instrument;

use crate::backend::{BackendClient, BackendRequest, TokenPair};

use super::AuthError;

/// Backend path of the refresh exchange.
pub const REFRESH_PATH: &str = "/auth/refresh";

/// How long a successful exchange is reused for the same refresh token.
const REUSE_WINDOW: Duration = Duration::from_secs(30);

/// Upper bound on remembered exchanges.
const MAX_ENTRIES: u64 = 10_000;

/// Coordinates refresh-token exchanges with the backend.
#[derive(Clone)]
pub struct RefreshCoordinator {
    backend: BackendClient,
    recent: Cache<String, TokenPair>,
}

impl RefreshCoordinator {
    /// Create a coordinator on top of `backend`.
    #[must_use]
    pub fn new(backend: BackendClient) -> Self {
        let recent = Cache::builder()
            .max_capacity(MAX_ENTRIES)
            .time_to_live(REUSE_WINDOW)
            .build();

        Self { backend, recent }
    }

    /// Exchange `refresh_token` for a new token pair.
    ///
    /// Concurrent calls with the same refresh token share one backend call.
    /// Failures are not remembered; the next caller tries again.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::RefreshRejected` when the backend refuses the
    /// token, `AuthError::MalformedTokens` when its answer carries no session
    /// token, and `AuthError::Upstream`/`NotConfigured` on transport failure.
    #[instrument(skip_all)]
    pub async fn refresh(&self, refresh_token: &SecretString) -> Result<TokenPair, AuthError> {
        let key = cache_key(refresh_token);
        self.recent
            .try_get_with(key, self.exchange(refresh_token))
            .await
            .map_err(|err: Arc<AuthError>| (*err).clone())
    }

    async fn exchange(&self, refresh_token: &SecretString) -> Result<TokenPair, AuthError> {
        let request = BackendRequest::post_json(
            REFRESH_PATH,
            &json!({ "refreshToken": refresh_token.expose_secret() }),
        );
        let response = self.backend.send(&request, None).await?;

        if !response.status.is_success() {
            tracing::info!(status = %response.status, "Refresh token rejected");
            return Err(AuthError::RefreshRejected(response.status));
        }

        let pair = response
            .json()
            .as_ref()
            .and_then(TokenPair::from_body)
            .ok_or(AuthError::MalformedTokens)?;

        tracing::debug!(rotated = pair.refresh_token.is_some(), "Session refreshed");
        Ok(pair)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Cache key for a refresh token. The raw token is never kept in memory
/// longer than the request that carried it.
fn cache_key(refresh_token: &SecretString) -> String {
    let digest = Sha256::digest(refresh_token.expose_secret().as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}
