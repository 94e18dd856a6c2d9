use std::{
    collections::BTreeMap,
    sync::Arc,
};

use serde::{
    Deserialize,
    Serialize,
};
use tracing::{
    debug,
    info,
};

use crate::{
    core::{
        Clock,
        KanjiEntry,
        KanjiError,
    },
    persistence::{
        load_json_or_default,
        save_json,
        Storage,
    },
};

pub const CACHE_KEY: &str = "kanji_cache";
pub const CACHE_VERSION: u32 = 1;
pub const DEFAULT_MAX_AGE_MILLIS: i64 = 7 * 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedLevel {
    data: Vec<KanjiEntry>,
    timestamp: i64,
    version: u32,
}

type CacheMap = BTreeMap<String, CachedLevel>;

/// Per-level catalog cache with age-based expiry, persisted in one storage key.
pub struct CatalogCache {
    storage: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
    max_age_millis: i64,
}

impl CatalogCache {
    pub fn new(storage: Arc<dyn Storage>, clock: Arc<dyn Clock>) -> Self {
        Self { storage, clock, max_age_millis: DEFAULT_MAX_AGE_MILLIS }
    }

    pub fn with_max_age(mut self, max_age: chrono::Duration) -> Self {
        self.max_age_millis = max_age.num_milliseconds();
        self
    }

    fn load(&self) -> CacheMap {
        load_json_or_default(self.storage.as_ref(), CACHE_KEY)
    }

    fn save(&self, cache: &CacheMap) -> Result<(), KanjiError> {
        save_json(self.storage.as_ref(), CACHE_KEY, cache)
    }

    fn is_fresh(&self, cached: &CachedLevel, now: i64) -> bool {
        cached.version == CACHE_VERSION && now - cached.timestamp <= self.max_age_millis
    }

    /// Cached entries for `level`; an expired entry is evicted and reported as a miss.
    pub fn get(&self, level: &str) -> Option<Vec<KanjiEntry>> {
        let mut cache = self.load();
        let now = self.clock.now_millis();

        let fresh = self.is_fresh(cache.get(level)?, now);
        if fresh {
            return cache.remove(level).map(|cached| cached.data);
        }

        info!(level, "catalog cache expired");
        cache.remove(level);
        if let Err(e) = self.save(&cache) {
            debug!(error = %e, "failed to evict expired cache entry");
        }
        None
    }

    pub fn put(&self, level: &str, data: Vec<KanjiEntry>) -> Result<(), KanjiError> {
        let mut cache = self.load();
        cache.insert(
            level.to_string(),
            CachedLevel { data, timestamp: self.clock.now_millis(), version: CACHE_VERSION },
        );
        self.save(&cache)
    }

    /// Returns how many levels were evicted.
    pub fn prune_expired(&self) -> Result<usize, KanjiError> {
        let mut cache = self.load();
        let now = self.clock.now_millis();
        let before = cache.len();

        cache.retain(|_, cached| self.is_fresh(cached, now));
        let pruned = before - cache.len();
        if pruned > 0 {
            self.save(&cache)?;
        }
        Ok(pruned)
    }

    pub fn clear(&self) -> Result<(), KanjiError> {
        self.save(&CacheMap::new())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{
        Duration,
        TimeZone,
        Utc,
    };

    use super::*;
    use crate::{
        catalog::data::level_entries,
        core::ManualClock,
        persistence::MemoryStorage,
    };

    fn setup() -> (Arc<ManualClock>, CatalogCache) {
        let storage = Arc::new(MemoryStorage::new());
        let clock = Arc::new(ManualClock::utc(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()));
        let cache = CatalogCache::new(storage, clock.clone());
        (clock, cache)
    }

    #[test]
    fn test_get_within_max_age() {
        let (clock, cache) = setup();
        let entries = level_entries("N4").unwrap();
        cache.put("N4", entries.clone()).unwrap();

        clock.advance(Duration::days(7));
        assert_eq!(cache.get("N4"), Some(entries));
        assert_eq!(cache.get("N3"), None);
    }

    #[test]
    fn test_expired_entry_is_evicted() {
        let (clock, cache) = setup();
        cache.put("N5", level_entries("N5").unwrap()).unwrap();
        clock.advance(Duration::days(7) + Duration::milliseconds(1));

        assert_eq!(cache.get("N5"), None);
        // Evicted, so a later clock rollback does not resurrect it
        clock.advance(Duration::days(-7));
        assert_eq!(cache.get("N5"), None);
    }

    #[test]
    fn test_prune_expired() {
        let (clock, cache) = setup();
        cache.put("N5", level_entries("N5").unwrap()).unwrap();
        clock.advance(Duration::days(5));
        cache.put("N4", level_entries("N4").unwrap()).unwrap();
        clock.advance(Duration::days(3));

        assert_eq!(cache.prune_expired().unwrap(), 1);
        assert!(cache.get("N4").is_some());
        assert!(cache.get("N5").is_none());

        cache.clear().unwrap();
        assert!(cache.get("N4").is_none());
    }
}
