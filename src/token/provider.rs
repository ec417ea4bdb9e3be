//! Single entry point for obtaining a usable access token.

use super::{Clock, TokenCache, TokenError, TokenRefresher};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Hands out access tokens, refreshing lazily when the cached one goes stale.
///
/// There is no background timer: a refresh happens only when a caller needs a
/// token and the cache is stale. Concurrent callers that observe a stale cache
/// share one refresh exchange through `refresh_guard`; whoever acquires the
/// guard second re-checks the cache before exchanging again.
///
/// Shared across handlers as `Arc<TokenProvider>`.
pub struct TokenProvider {
    cache: TokenCache,
    refresher: TokenRefresher,
    clock: Arc<dyn Clock>,
    refresh_guard: Mutex<()>,
}

impl TokenProvider {
    /// Provider with an empty cache.
    pub fn new(refresher: TokenRefresher, clock: Arc<dyn Clock>) -> Self {
        Self::with_cache(refresher, clock, TokenCache::new())
    }

    /// Provider pre-seeded with a token from persisted configuration.
    pub fn seeded(
        refresher: TokenRefresher,
        clock: Arc<dyn Clock>,
        access_token: String,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self::with_cache(refresher, clock, TokenCache::seeded(access_token, expires_at))
    }

    fn with_cache(refresher: TokenRefresher, clock: Arc<dyn Clock>, cache: TokenCache) -> Self {
        Self {
            cache,
            refresher,
            clock,
            refresh_guard: Mutex::new(()),
        }
    }

    /// Returns the cached token while it is valid, otherwise refreshes.
    ///
    /// The cache-hit path does not suspend. Refresh failures are returned
    /// unchanged; a stale token is never handed out.
    pub async fn get_access_token(&self) -> Result<String, TokenError> {
        if let Some(token) = self.cache.valid_token(self.clock.now()) {
            return Ok(token);
        }

        let _guard = self.refresh_guard.lock().await;

        // Another caller may have refreshed while we waited for the guard
        if let Some(token) = self.cache.valid_token(self.clock.now()) {
            debug!("Using access token refreshed by concurrent caller");
            return Ok(token);
        }

        debug!("Cached access token missing or stale, refreshing");
        self.refresher.refresh(&self.cache, self.clock.as_ref()).await
    }

    /// Refreshes unconditionally, bypassing the liveness check.
    ///
    /// Meant for callers that just saw the upstream reject the current token.
    pub async fn force_refresh(&self) -> Result<String, TokenError> {
        let _guard = self.refresh_guard.lock().await;
        debug!("Forced access token refresh");
        self.refresher.refresh(&self.cache, self.clock.as_ref()).await
    }

    /// Whether the cached token is currently usable without a refresh.
    pub fn has_valid_token(&self) -> bool {
        self.cache.is_valid(self.clock.now())
    }

    /// Read access to the cache (diagnostics and tests).
    pub fn cache(&self) -> &TokenCache {
        &self.cache
    }
}
