use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    inserted_at: Instant,
}

/// Bounded, time-limited memo of geocoder responses. When full, expired entries are
/// dropped first and then the oldest remaining entry.
#[derive(Debug)]
pub struct GeocodeCache<V> {
    ttl: Duration,
    capacity: usize,
    entries: Mutex<HashMap<String, Entry<V>>>,
}

impl<V: Clone> GeocodeCache<V> {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity: capacity.max(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry<V>>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, key: &str) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    pub fn insert(&self, key: impl Into<String>, value: V) {
        self.insert_at(key, value, Instant::now());
    }

    pub fn get_at(&self, key: &str, now: Instant) -> Option<V> {
        let mut entries = self.lock();
        match entries.get(key) {
            Some(entry) if now.saturating_duration_since(entry.inserted_at) < self.ttl => {
                Some(entry.value.clone())
            }
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn insert_at(&self, key: impl Into<String>, value: V, now: Instant) {
        let key = key.into();
        let mut entries = self.lock();

        if !entries.contains_key(&key) && entries.len() >= self.capacity {
            let ttl = self.ttl;
            entries.retain(|_, entry| now.saturating_duration_since(entry.inserted_at) < ttl);

            if entries.len() >= self.capacity {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.inserted_at)
                    .map(|(key, _)| key.clone());
                if let Some(oldest) = oldest {
                    entries.remove(&oldest);
                }
            }
        }

        entries.insert(
            key,
            Entry {
                value,
                inserted_at: now,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_fresh_entries() {
        let cache = GeocodeCache::new(Duration::from_secs(60), 4);
        let start = Instant::now();
        cache.insert_at("8.98240,-79.51990", "Bella Vista", start);

        assert_eq!(
            cache.get_at("8.98240,-79.51990", start + Duration::from_secs(59)),
            Some("Bella Vista")
        );
    }

    #[test]
    fn expired_entries_are_dropped_on_read() {
        let cache = GeocodeCache::new(Duration::from_secs(60), 4);
        let start = Instant::now();
        cache.insert_at("key", 1, start);

        assert_eq!(cache.get_at("key", start + Duration::from_secs(60)), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn evicts_expired_before_oldest() {
        let cache = GeocodeCache::new(Duration::from_secs(10), 2);
        let start = Instant::now();
        cache.insert_at("stale", 1, start);
        cache.insert_at("fresh", 2, start + Duration::from_secs(9));
        cache.insert_at("new", 3, start + Duration::from_secs(11));

        let now = start + Duration::from_secs(11);
        assert_eq!(cache.get_at("stale", now), None);
        assert_eq!(cache.get_at("fresh", now), Some(2));
        assert_eq!(cache.get_at("new", now), Some(3));
    }

    #[test]
    fn evicts_oldest_when_everything_is_fresh() {
        let cache = GeocodeCache::new(Duration::from_secs(600), 2);
        let start = Instant::now();
        cache.insert_at("a", 1, start);
        cache.insert_at("b", 2, start + Duration::from_secs(1));
        cache.insert_at("c", 3, start + Duration::from_secs(2));

        let now = start + Duration::from_secs(3);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get_at("a", now), None);
        assert_eq!(cache.get_at("b", now), Some(2));
    }

    #[test]
    fn overwriting_a_key_does_not_evict() {
        let cache = GeocodeCache::new(Duration::from_secs(600), 2);
        let start = Instant::now();
        cache.insert_at("a", 1, start);
        cache.insert_at("b", 2, start);
        cache.insert_at("a", 10, start + Duration::from_secs(1));

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get_at("a", start + Duration::from_secs(2)), Some(10));
    }
}
