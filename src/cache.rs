//! Memoization of analysis results
//!
//! Repeated requests with the same dataset and parameters are common when a
//! reporting layer re-renders. Results are cached under an explicit key —
//! the dataset content fingerprint plus a canonical parameter string — with
//! least-recently-used eviction. Correctness never depends on the cache:
//! a miss simply recomputes.

use std::collections::HashMap;

/// Key identifying one analysis request
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AnalysisKey {
    /// Content fingerprint of the input dataset
    pub fingerprint: u64,

    /// Canonical rendering of the request parameters
    pub params: String,
}

impl AnalysisKey {
    pub fn new(fingerprint: u64, params: impl Into<String>) -> Self {
        Self {
            fingerprint,
            params: params.into(),
        }
    }
}

#[derive(Debug)]
struct Entry<T> {
    value: T,
    last_used: u64,
}

/// LRU cache for analysis results
#[derive(Debug)]
pub struct AnalysisCache<T> {
    capacity: usize,
    entries: HashMap<AnalysisKey, Entry<T>>,
    clock: u64,

    /// Statistics
    pub cache_hits: u64,
    pub cache_misses: u64,
}

impl<T: Clone> AnalysisCache<T> {
    /// Create a cache holding at most `capacity` results
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            clock: 0,
            cache_hits: 0,
            cache_misses: 0,
        }
    }

    /// Fetch the cached result or compute and store it
    pub fn get_or_insert_with(&mut self, key: AnalysisKey, compute: impl FnOnce() -> T) -> T {
        self.clock += 1;
        let clock = self.clock;

        if let Some(entry) = self.entries.get_mut(&key) {
            entry.last_used = clock;
            self.cache_hits += 1;
            return entry.value.clone();
        }

        self.cache_misses += 1;
        let value = compute();

        if self.entries.len() >= self.capacity {
            self.evict_oldest();
        }
        self.entries.insert(
            key,
            Entry {
                value: value.clone(),
                last_used: clock,
            },
        );
        value
    }

    /// Drop every result computed from the given dataset
    ///
    /// Call when the underlying data is reloaded; results keyed by other
    /// fingerprints stay valid.
    pub fn invalidate_dataset(&mut self, fingerprint: u64) {
        self.entries.retain(|key, _| key.fingerprint != fingerprint);
    }

    /// Drop everything
    pub fn clear(&mut self) {
        self.entries.clear();
        self.cache_hits = 0;
        self.cache_misses = 0;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fraction of lookups served from cache
    pub fn hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }

    fn evict_oldest(&mut self) {
        if let Some(key) = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(key, _)| key.clone())
        {
            self.entries.remove(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_and_miss_accounting() {
        let mut cache: AnalysisCache<u32> = AnalysisCache::new(4);
        let key = AnalysisKey::new(42, "dimension=region");

        let first = cache.get_or_insert_with(key.clone(), || 7);
        let second = cache.get_or_insert_with(key, || unreachable!("must hit"));

        assert_eq!(first, 7);
        assert_eq!(second, 7);
        assert_eq!(cache.cache_hits, 1);
        assert_eq!(cache.cache_misses, 1);
        assert_eq!(cache.hit_rate(), 0.5);
    }

    #[test]
    fn test_distinct_params_are_distinct_entries() {
        let mut cache: AnalysisCache<u32> = AnalysisCache::new(4);
        cache.get_or_insert_with(AnalysisKey::new(42, "dimension=region"), || 1);
        cache.get_or_insert_with(AnalysisKey::new(42, "dimension=brand"), || 2);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.cache_misses, 2);
    }

    #[test]
    fn test_lru_eviction() {
        let mut cache: AnalysisCache<u32> = AnalysisCache::new(2);
        let a = AnalysisKey::new(1, "a");
        let b = AnalysisKey::new(1, "b");
        let c = AnalysisKey::new(1, "c");

        cache.get_or_insert_with(a.clone(), || 1);
        cache.get_or_insert_with(b.clone(), || 2);
        cache.get_or_insert_with(a.clone(), || unreachable!()); // refresh a
        cache.get_or_insert_with(c, || 3); // evicts b

        assert_eq!(cache.len(), 2);
        cache.get_or_insert_with(a, || unreachable!("a should survive"));
        let recomputed = cache.get_or_insert_with(b, || 20);
        assert_eq!(recomputed, 20);
    }

    #[test]
    fn test_invalidate_by_fingerprint() {
        let mut cache: AnalysisCache<u32> = AnalysisCache::new(8);
        cache.get_or_insert_with(AnalysisKey::new(1, "a"), || 1);
        cache.get_or_insert_with(AnalysisKey::new(1, "b"), || 2);
        cache.get_or_insert_with(AnalysisKey::new(2, "a"), || 3);

        cache.invalidate_dataset(1);
        assert_eq!(cache.len(), 1);

        let recomputed = cache.get_or_insert_with(AnalysisKey::new(1, "a"), || 10);
        assert_eq!(recomputed, 10);
    }
}
