pub mod feed;

use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Clone)]
pub struct CachedBody {
    pub body: Vec<u8>,
    pub created_at: Instant,
}

// Short-TTL cache for bulk result payloads, keyed by the sorted,
// comma-joined id list. Bounded capacity; when full, the single oldest
// entry is evicted per insert. Hits do not refresh an entry's position,
// only writes set it.
pub struct ResultsCache {
    ttl: Duration,
    max_entries: usize,
    entries: HashMap<String, CachedBody>,
}

impl ResultsCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            ttl,
            max_entries,
            entries: HashMap::new(),
        }
    }

    // Canonical cache key for a set of poll ids: order-insensitive, so the
    // same id set always lands on the same entry.
    pub fn key(ids: &[String]) -> String {
        let mut sorted: Vec<&str> = ids.iter().map(|id| id.as_str()).collect();
        sorted.sort_unstable();
        sorted.join(",")
    }

    pub fn get(&mut self, key: &str) -> Option<CachedBody> {
        self.entries
            .retain(|_, entry| entry.created_at.elapsed() <= self.ttl);
        self.entries.get(key).cloned()
    }

    pub fn insert(&mut self, key: String, body: Vec<u8>) {
        self.entries
            .retain(|_, entry| entry.created_at.elapsed() <= self.ttl);
        if self.entries.len() >= self.max_entries {
            if let Some(victim) = self
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.created_at)
                .map(|(k, _)| k.clone())
            {
                self.entries.remove(&victim);
            }
        }
        self.entries.insert(
            key,
            CachedBody {
                body,
                created_at: Instant::now(),
            },
        );
    }
}
