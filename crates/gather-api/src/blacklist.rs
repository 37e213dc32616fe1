use std::sync::Arc;
use std::time::Duration;

use gather_cache::Cache;

use crate::keys::CacheKey;

/// Tracks revoked bearer tokens until their natural expiry. Backed by the
/// shared TTL cache, so a blacklist record disappears exactly when the token
/// itself would stop validating.
#[derive(Clone)]
pub struct TokenBlacklist {
    cache: Arc<Cache>,
}

impl TokenBlacklist {
    pub fn new(cache: Arc<Cache>) -> Self {
        Self { cache }
    }

    pub fn blacklist(&self, token: &str, ttl: Duration) {
        self.cache.set(&CacheKey::Blacklist(token).to_string(), true, ttl);
    }

    pub fn is_blacklisted(&self, token: &str) -> bool {
        self.cache
            .get::<bool>(&CacheKey::Blacklist(token).to_string())
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blacklisted_until_ttl_runs_out() {
        let registry = TokenBlacklist::new(Arc::new(Cache::new()));
        assert!(!registry.is_blacklisted("tok"));

        registry.blacklist("tok", Duration::from_millis(30));
        assert!(registry.is_blacklisted("tok"));
        assert!(!registry.is_blacklisted("other"));

        std::thread::sleep(Duration::from_millis(60));
        assert!(!registry.is_blacklisted("tok"));
    }
}
