//! In-process key/value cache with per-entry TTL.
//!
//! Backs both the object cache (users, events, comment lists) and the
//! pending-file tracker. Entries optionally carry a sliding window: every
//! read extends the entry's life by the window, capped at the absolute
//! deadline set when the entry was stored.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tracing::debug;

struct Entry {
    value: Arc<dyn Any + Send + Sync>,
    expires_at: Instant,
    /// Upper bound sliding reads can never push `expires_at` past.
    hard_deadline: Instant,
    sliding: Option<Duration>,
}

#[derive(Default)]
pub struct Cache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl Cache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value with an absolute TTL.
    pub fn set<T: Any + Send + Sync>(&self, key: &str, value: T, ttl: Duration) {
        let now = Instant::now();
        self.lock().insert(
            key.to_string(),
            Entry {
                value: Arc::new(value),
                expires_at: now + ttl,
                hard_deadline: now + ttl,
                sliding: None,
            },
        );
    }

    /// Store a value with an absolute TTL plus a sliding window refreshed on
    /// every read.
    pub fn set_sliding<T: Any + Send + Sync>(
        &self,
        key: &str,
        value: T,
        absolute: Duration,
        sliding: Duration,
    ) {
        let now = Instant::now();
        self.lock().insert(
            key.to_string(),
            Entry {
                value: Arc::new(value),
                expires_at: now + sliding.min(absolute),
                hard_deadline: now + absolute,
                sliding: Some(sliding),
            },
        );
    }

    /// `None` is a miss (absent or expired); a present entry of another type
    /// is treated as a miss as well.
    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        let mut entries = self.lock();
        let now = Instant::now();

        let entry = entries.get_mut(key)?;
        if now >= entry.expires_at {
            entries.remove(key);
            return None;
        }

        if let Some(sliding) = entry.sliding {
            entry.expires_at = (now + sliding).min(entry.hard_deadline);
        }

        entry.value.clone().downcast::<T>().ok()
    }

    pub fn remove(&self, key: &str) {
        self.lock().remove(key);
    }

    /// Drops every expired entry; meant to run from a periodic sweep task so
    /// never-read entries do not pile up.
    pub fn purge_expired(&self) -> usize {
        let mut entries = self.lock();
        let now = Instant::now();
        let before = entries.len();
        entries.retain(|_, entry| now < entry.expires_at);
        let purged = before - entries.len();
        if purged > 0 {
            debug!("cache sweep dropped {purged} expired entries");
        }
        purged
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        // A poisoned map is still structurally valid; keep serving.
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn miss_then_hit_then_remove() {
        let cache = Cache::new();
        assert!(cache.get::<String>("k").is_none());

        cache.set("k", "v".to_string(), Duration::from_secs(60));
        assert_eq!(*cache.get::<String>("k").unwrap(), "v");

        cache.remove("k");
        assert!(cache.get::<String>("k").is_none());
    }

    #[test]
    fn absolute_ttl_expires() {
        let cache = Cache::new();
        cache.set("k", 1u32, Duration::from_millis(20));
        assert!(cache.get::<u32>("k").is_some());

        sleep(Duration::from_millis(40));
        assert!(cache.get::<u32>("k").is_none());
    }

    #[test]
    fn sliding_reads_extend_up_to_the_hard_deadline() {
        let cache = Cache::new();
        cache.set_sliding("k", 1u32, Duration::from_millis(120), Duration::from_millis(40));

        // Keep reading inside the sliding window; the entry stays alive past
        // what a single window would allow.
        for _ in 0..3 {
            sleep(Duration::from_millis(25));
            assert!(cache.get::<u32>("k").is_some());
        }

        // After the absolute deadline no read can save it.
        sleep(Duration::from_millis(80));
        assert!(cache.get::<u32>("k").is_none());
    }

    #[test]
    fn unread_sliding_entry_expires_after_one_window() {
        let cache = Cache::new();
        cache.set_sliding("k", 1u32, Duration::from_secs(60), Duration::from_millis(20));
        sleep(Duration::from_millis(40));
        assert!(cache.get::<u32>("k").is_none());
    }

    #[test]
    fn wrong_type_is_a_miss() {
        let cache = Cache::new();
        cache.set("k", 1u32, Duration::from_secs(60));
        assert!(cache.get::<String>("k").is_none());
        assert!(cache.get::<u32>("k").is_some());
    }

    #[test]
    fn sweep_reports_purged_entries() {
        let cache = Cache::new();
        cache.set("a", 1u32, Duration::from_millis(10));
        cache.set("b", 2u32, Duration::from_secs(60));

        sleep(Duration::from_millis(30));
        assert_eq!(cache.purge_expired(), 1);
        assert!(cache.get::<u32>("b").is_some());
    }
}
