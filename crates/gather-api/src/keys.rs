use std::fmt;
use std::time::Duration;

/// Absolute lifetime of cached objects.
pub const OBJECT_TTL: Duration = Duration::from_secs(5 * 60);
/// Sliding window: every read extends the entry by this much, capped at
/// [`OBJECT_TTL`].
pub const OBJECT_SLIDING: Duration = Duration::from_secs(60);

/// Cache key namespace. One place for every prefix, so invalidation sites
/// cannot drift out of sync with the read sites.
pub enum CacheKey<'a> {
    User(i64),
    Event(i64),
    EventComments(i64),
    Blacklist(&'a str),
}

impl fmt::Display for CacheKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::User(id) => write!(f, "user_{id}"),
            CacheKey::Event(id) => write!(f, "event_{id}"),
            CacheKey::EventComments(id) => write!(f, "event_comments_{id}"),
            CacheKey::Blacklist(token) => write!(f, "blacklist_{token}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_namespaced() {
        assert_eq!(CacheKey::User(3).to_string(), "user_3");
        assert_eq!(CacheKey::Event(9).to_string(), "event_9");
        assert_eq!(CacheKey::EventComments(9).to_string(), "event_comments_9");
        assert_eq!(CacheKey::Blacklist("abc").to_string(), "blacklist_abc");
    }
}
