//! Access token value and the per-flow token cache.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::FlowError;

/// Default safety margin: a token expiring within this window is treated as stale.
pub const DEFAULT_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// An access token with its absolute expiration instant.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct CachedToken {
    access_token: String,
    #[zeroize(skip)]
    token_type: String,
    #[zeroize(skip)]
    expires_at: Instant,
}

impl CachedToken {
    /// Creates a token expiring at the given instant.
    pub fn new(access_token: impl Into<String>, token_type: impl Into<String>, expires_at: Instant) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: token_type.into(),
            expires_at,
        }
    }

    /// Creates a token expiring `lifetime` from now.
    ///
    /// Returns `None` when the expiration instant cannot be represented.
    pub fn with_lifetime(
        access_token: impl Into<String>,
        token_type: impl Into<String>,
        lifetime: Duration,
    ) -> Option<Self> {
        let expires_at = Instant::now().checked_add(lifetime)?;
        Some(Self::new(access_token, token_type, expires_at))
    }

    /// Returns the access token value.
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Returns the token type reported by the server (usually `Bearer`).
    pub fn token_type(&self) -> &str {
        &self.token_type
    }

    /// Returns the expiration instant.
    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    /// Checks if the token is expired.
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    /// Checks if the token expires in less than `margin`.
    ///
    /// A margin too large to be added to the current instant makes every token stale.
    pub fn is_stale(&self, margin: Duration) -> bool {
        Instant::now()
            .checked_add(margin)
            .is_none_or(|limit| self.expires_at < limit)
    }

    /// Returns the time until expiration, `None` once expired.
    pub fn time_until_expiry(&self) -> Option<Duration> {
        self.expires_at.checked_duration_since(Instant::now())
    }
}

impl fmt::Debug for CachedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedToken")
            .field("access_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Per-flow token cache.
///
/// The lock is held across the whole check-exchange-store sequence, so callers
/// sharing a flow never run two exchanges at once and never observe a partially
/// updated token.
#[derive(Debug)]
pub(crate) struct TokenCache {
    slot: Mutex<Option<CachedToken>>,
    margin: Duration,
}

impl TokenCache {
    pub(crate) fn new(margin: Duration) -> Self {
        Self {
            slot: Mutex::new(None),
            margin,
        }
    }

    /// Returns the cached token, or runs `exchange` and caches its result.
    ///
    /// On failure the previous token, if any, stays in place.
    pub(crate) async fn get_or_exchange<F, Fut>(&self, exchange: F) -> Result<CachedToken, FlowError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<CachedToken, FlowError>>,
    {
        let mut slot = self.slot.lock().await;
        if let Some(token) = slot.as_ref().filter(|token| !token.is_stale(self.margin)) {
            debug!(expires_in = ?token.time_until_expiry(), "reusing cached token");
            return Ok(token.clone());
        }

        debug!(cached = slot.is_some(), "token missing or stale, exchanging");
        let token = exchange().await?;
        *slot = Some(token.clone());
        Ok(token)
    }

    pub(crate) async fn is_populated(&self) -> bool {
        self.slot.lock().await.is_some()
    }
}

impl Default for TokenCache {
    fn default() -> Self {
        Self::new(DEFAULT_REFRESH_MARGIN)
    }
}
