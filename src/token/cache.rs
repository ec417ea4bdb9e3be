//! In-memory holder for the current access token.

use super::EXPIRY_SKEW_SECONDS;
use chrono::{DateTime, Duration, Utc};
use std::sync::{PoisonError, RwLock};

/// An access token together with the instant it stops being accepted upstream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CachedToken {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

impl CachedToken {
    /// True while `now < expires_at - 60s`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.access_token.is_empty() && now < self.expires_at - Duration::seconds(EXPIRY_SKEW_SECONDS)
    }
}

/// Holds the latest `(access_token, expires_at)` pair.
///
/// The pair lives behind one lock and is only ever replaced as a whole, so a
/// reader never sees a new token with an old expiry.
#[derive(Debug, Default)]
pub struct TokenCache {
    current: RwLock<Option<CachedToken>>,
}

impl TokenCache {
    /// Empty cache; the first `get_access_token` will refresh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache pre-seeded from persisted configuration.
    pub fn seeded(access_token: String, expires_at: DateTime<Utc>) -> Self {
        Self {
            current: RwLock::new(Some(CachedToken {
                access_token,
                expires_at,
            })),
        }
    }

    /// Whether a token is present and still outside the skew window.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.read()
            .as_ref()
            .is_some_and(|token| token.is_valid_at(now))
    }

    /// The cached token if it is still valid at `now`.
    pub fn valid_token(&self, now: DateTime<Utc>) -> Option<String> {
        self.read()
            .as_ref()
            .filter(|token| token.is_valid_at(now))
            .map(|token| token.access_token.clone())
    }

    /// Snapshot of the current pair, valid or not.
    pub fn current(&self) -> Option<CachedToken> {
        self.read().clone()
    }

    /// Replaces the pair in one write.
    pub fn replace(&self, access_token: String, expires_at: DateTime<Utc>) {
        let mut current = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *current = Some(CachedToken {
            access_token,
            expires_at,
        });
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Option<CachedToken>> {
        self.current.read().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_cache_is_invalid() {
        let cache = TokenCache::new();
        assert!(!cache.is_valid(Utc::now()));
        assert_eq!(cache.valid_token(Utc::now()), None);
        assert_eq!(cache.current(), None);
    }

    #[test]
    fn test_valid_until_skew_window() {
        let now = Utc::now();
        let cache = TokenCache::seeded("tok".to_string(), now + Duration::seconds(3600));

        assert!(cache.is_valid(now));
        assert!(cache.is_valid(now + Duration::seconds(3539)));
        // Inside the last 60 seconds the token is treated as expired
        assert!(!cache.is_valid(now + Duration::seconds(3540)));
        assert!(!cache.is_valid(now + Duration::seconds(3601)));
    }

    #[test]
    fn test_expiry_within_skew_is_invalid_immediately() {
        let now = Utc::now();
        let cache = TokenCache::seeded("tok".to_string(), now + Duration::seconds(30));
        assert!(!cache.is_valid(now));
        // Stale pair is still readable for diagnostics
        assert_eq!(cache.current().unwrap().access_token, "tok");
    }

    #[test]
    fn test_empty_token_string_is_invalid() {
        let now = Utc::now();
        let cache = TokenCache::seeded(String::new(), now + Duration::hours(1));
        assert!(!cache.is_valid(now));
    }

    #[test]
    fn test_replace_overwrites_both_fields() {
        let now = Utc::now();
        let cache = TokenCache::seeded("old".to_string(), now - Duration::hours(1));
        assert!(!cache.is_valid(now));

        cache.replace("new".to_string(), now + Duration::hours(1));

        let current = cache.current().unwrap();
        assert_eq!(current.access_token, "new");
        assert_eq!(current.expires_at, now + Duration::hours(1));
        assert_eq!(cache.valid_token(now), Some("new".to_string()));
    }
}
