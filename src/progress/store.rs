use std::sync::{
    Arc,
    Mutex,
    MutexGuard,
};

use serde::Serialize;
use serde_json::Value;
use tracing::{
    debug,
    info,
    warn,
};

use super::{
    record::ProgressRecord,
    recent::{
        RecentList,
        DEFAULT_RECENT_VIEW,
    },
    settings::{
        Settings,
        SettingsMap,
    },
    snapshot::{
        Snapshot,
        SNAPSHOT_RECENT_LIMIT,
        SNAPSHOT_VERSION,
    },
};
use crate::{
    catalog::CatalogCache,
    core::{
        Clock,
        KanjiError,
        RecentEntry,
        DEFAULT_LEVEL,
    },
    persistence::{
        load_json,
        load_json_or_default,
        save_json,
        Storage,
    },
};

pub const PROGRESS_KEY: &str = "kanji_progress";
pub const RECENT_KEY: &str = "kanji_recent";
pub const SETTINGS_KEY: &str = "kanji_settings";

/// Mastered count that fills the progress bar.
pub const PROGRESS_GOAL: usize = 100;

const DAY_MILLIS: u64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_mastered: usize,
    pub total_studied: usize,
    pub current_streak: u32,
    pub days_active: u64,
    pub average_per_day: f64,
    pub recent_activity: usize,
    pub study_start_date: i64,
    pub last_study_date: Option<i64>,
    pub goal_percentage: f64,
}

/// Single writer over the durable learner state.
///
/// Each mutation takes the write lock, reads the whole record, applies the
/// change and writes the whole record back. Nothing is cached in memory, so
/// a failed write leaves the previously stored record as the truth.
pub struct ProgressStore {
    storage: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
    default_level: String,
    write_lock: Mutex<()>,
}

impl ProgressStore {
    pub fn new(storage: Arc<dyn Storage>, clock: Arc<dyn Clock>) -> Self {
        Self { storage, clock, default_level: DEFAULT_LEVEL.to_string(), write_lock: Mutex::new(()) }
    }

    pub fn with_default_level(mut self, level: &str) -> Self {
        self.default_level = level.to_string();
        self
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Makes sure a progress record and a recent list exist.
    pub fn init(&self) -> Result<(), KanjiError> {
        let _guard = self.lock();
        self.read_progress()?;
        if self.storage.get(RECENT_KEY)?.is_none() {
            save_json(self.storage.as_ref(), RECENT_KEY, &Vec::<RecentEntry>::new())?;
        }
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        // The guard protects no data, so a poisoned lock is still usable
        self.write_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn default_record(&self) -> ProgressRecord {
        ProgressRecord::new(&self.default_level, self.clock.now_millis())
    }

    /// Caller must hold the write lock.
    fn read_progress(&self) -> Result<ProgressRecord, KanjiError> {
        match load_json::<ProgressRecord>(self.storage.as_ref(), PROGRESS_KEY) {
            Ok(Some(record)) => Ok(record),
            Ok(None) => {
                let record = self.default_record();
                if let Err(e) = self.write_progress(&record) {
                    warn!(error = %e, "could not persist initial progress record");
                }
                Ok(record)
            }
            Err(KanjiError::Json(e)) => {
                warn!(error = %e, "stored progress is unreadable, starting a fresh record");
                let record = self.default_record();
                self.write_progress(&record)?;
                Ok(record)
            }
            Err(e) => Err(e),
        }
    }

    fn write_progress(&self, record: &ProgressRecord) -> Result<(), KanjiError> {
        save_json(self.storage.as_ref(), PROGRESS_KEY, record)
    }

    fn update<F>(&self, apply: F) -> Result<ProgressRecord, KanjiError>
    where
        F: FnOnce(&mut ProgressRecord),
    {
        let _guard = self.lock();
        let mut record = self.read_progress()?;
        apply(&mut record);
        self.write_progress(&record)?;
        Ok(record)
    }

    pub fn get_progress(&self) -> Result<ProgressRecord, KanjiError> {
        let _guard = self.lock();
        self.read_progress()
    }

    pub fn mark_mastered(&self, character: &str) -> Result<ProgressRecord, KanjiError> {
        let record = self.update(|record| record.mark_mastered(character, self.clock.as_ref()))?;
        debug!(character, streak = record.streak, "marked mastered");
        Ok(record)
    }

    /// `mark_mastered` plus a recent-list entry, written together. If the
    /// recent list cannot be saved the previous progress is put back.
    pub fn record_mastery(&self, character: &str, recent: RecentEntry) -> Result<ProgressRecord, KanjiError> {
        let _guard = self.lock();
        let previous = self.storage.get(PROGRESS_KEY)?;

        let mut record = self.read_progress()?;
        record.mark_mastered(character, self.clock.as_ref());
        self.write_progress(&record)?;

        let mut list = self.read_recent();
        list.add(recent);
        if let Err(e) = save_json(self.storage.as_ref(), RECENT_KEY, &list.to_vec()) {
            warn!(character, error = %e, "failed to record recent kanji, rolling back mastery");
            self.restore(&[(PROGRESS_KEY, previous)]);
            return Err(e);
        }

        debug!(character, streak = record.streak, "marked mastered");
        Ok(record)
    }

    pub fn mark_studied(&self, character: &str) -> Result<ProgressRecord, KanjiError> {
        self.update(|record| record.mark_studied(character, self.clock.as_ref()))
    }

    pub fn skip(&self, character: &str) -> Result<ProgressRecord, KanjiError> {
        self.update(|record| record.skip(character))
    }

    pub fn set_current_level(&self, level: &str) -> Result<ProgressRecord, KanjiError> {
        self.update(|record| record.current_level = level.to_string())
    }

    pub fn reset(&self) -> Result<ProgressRecord, KanjiError> {
        let _guard = self.lock();
        let record = self.default_record();
        self.write_progress(&record)?;
        info!("progress reset");
        Ok(record)
    }

    pub fn is_mastered(&self, character: &str) -> bool {
        self.get_progress().map(|record| record.is_mastered(character)).unwrap_or(false)
    }

    pub fn is_studied(&self, character: &str) -> bool {
        self.get_progress().map(|record| record.is_studied(character)).unwrap_or(false)
    }

    fn read_recent(&self) -> RecentList {
        RecentList::from_entries(load_json_or_default(self.storage.as_ref(), RECENT_KEY))
    }

    pub fn add_to_recent(&self, entry: RecentEntry) -> Result<(), KanjiError> {
        let _guard = self.lock();
        let mut recent = self.read_recent();
        recent.add(entry);
        save_json(self.storage.as_ref(), RECENT_KEY, &recent.to_vec())
    }

    pub fn get_recent(&self, limit: usize) -> Vec<RecentEntry> {
        let _guard = self.lock();
        self.read_recent().get(limit)
    }

    pub fn clear_recent(&self) -> Result<(), KanjiError> {
        let _guard = self.lock();
        save_json(self.storage.as_ref(), RECENT_KEY, &Vec::<RecentEntry>::new())
    }

    pub fn settings_map(&self) -> SettingsMap {
        match load_json::<SettingsMap>(self.storage.as_ref(), SETTINGS_KEY) {
            Ok(Some(map)) => map,
            Ok(None) => Settings::default().to_map(),
            Err(e) => {
                warn!(error = %e, "failed to read settings, using defaults");
                Settings::default().to_map()
            }
        }
    }

    pub fn settings(&self) -> Settings {
        Settings::from_map(&self.settings_map())
    }

    pub fn save_settings(&self, settings: &SettingsMap) -> Result<(), KanjiError> {
        let _guard = self.lock();
        save_json(self.storage.as_ref(), SETTINGS_KEY, settings)
    }

    pub fn update_setting(&self, key: &str, value: Value) -> Result<(), KanjiError> {
        let _guard = self.lock();
        let mut map = self.settings_map();
        map.insert(key.to_string(), value);
        save_json(self.storage.as_ref(), SETTINGS_KEY, &map)
    }

    pub fn snapshot(&self) -> Result<Snapshot, KanjiError> {
        let _guard = self.lock();
        Ok(Snapshot {
            version: SNAPSHOT_VERSION,
            export_date: self.clock.now_millis(),
            progress: self.read_progress()?,
            recent: self.read_recent().get(SNAPSHOT_RECENT_LIMIT),
            settings: self.settings_map(),
        })
    }

    pub fn export_snapshot(&self) -> Result<String, KanjiError> {
        self.snapshot()?.to_json()
    }

    /// Replaces progress, recent list and settings with the snapshot's.
    /// Either all three are written or none is.
    pub fn import_snapshot(&self, blob: &str) -> Result<(), KanjiError> {
        let snapshot = Snapshot::parse(blob)?;

        let mut progress = snapshot.progress;
        progress.normalize();
        let recent = RecentList::from_entries(snapshot.recent);

        let writes = [
            (PROGRESS_KEY, serde_json::to_string_pretty(&progress)?),
            (RECENT_KEY, serde_json::to_string_pretty(&recent.to_vec())?),
            (SETTINGS_KEY, serde_json::to_string_pretty(&snapshot.settings)?),
        ];

        let _guard = self.lock();
        let mut previous = Vec::with_capacity(writes.len());
        for (key, _) in &writes {
            previous.push((*key, self.storage.get(key)?));
        }

        for (key, value) in &writes {
            if let Err(e) = self.storage.set(key, value) {
                warn!(key, error = %e, "import failed, restoring previous state");
                self.restore(&previous);
                return Err(e);
            }
        }

        info!(
            mastered = progress.mastered.len(),
            studied = progress.studied.len(),
            "imported snapshot"
        );
        Ok(())
    }

    fn restore(&self, previous: &[(&str, Option<String>)]) {
        for (key, value) in previous {
            let result = match value {
                Some(value) => self.storage.set(key, value),
                None => self.storage.remove(key),
            };
            if let Err(e) = result {
                warn!(key, error = %e, "failed to restore value");
            }
        }
    }

    pub fn stats(&self) -> Result<Stats, KanjiError> {
        let progress = self.get_progress()?;
        let recent_activity = self.get_recent(DEFAULT_RECENT_VIEW).len();

        let elapsed = self.clock.now_millis().saturating_sub(progress.start_date).unsigned_abs();
        let days_active = elapsed.div_ceil(DAY_MILLIS);
        let average_per_day = if days_active > 0 {
            (progress.studied.len() as f64 / days_active as f64 * 10.0).round() / 10.0
        } else {
            0.0
        };
        let goal_percentage =
            progress.mastered.len().min(PROGRESS_GOAL) as f64 * 100.0 / PROGRESS_GOAL as f64;

        Ok(Stats {
            total_mastered: progress.mastered.len(),
            total_studied: progress.studied.len(),
            current_streak: progress.streak,
            days_active,
            average_per_day,
            recent_activity,
            study_start_date: progress.start_date,
            last_study_date: progress.last_studied,
            goal_percentage,
        })
    }

    /// Drops expired catalog cache entries and re-caps the recent list.
    pub fn cleanup(&self) -> Result<(), KanjiError> {
        let pruned = CatalogCache::new(self.storage.clone(), self.clock.clone()).prune_expired()?;

        let _guard = self.lock();
        let recent = self.read_recent();
        save_json(self.storage.as_ref(), RECENT_KEY, &recent.to_vec())?;

        debug!(pruned, recent = recent.len(), "storage cleanup done");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{
        Duration,
        TimeZone,
        Utc,
    };
    use serde_json::json;

    use super::*;
    use crate::{
        core::ManualClock,
        persistence::MemoryStorage,
    };

    fn setup() -> (Arc<MemoryStorage>, Arc<ManualClock>, ProgressStore) {
        let storage = Arc::new(MemoryStorage::new());
        let clock = Arc::new(ManualClock::utc(Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap()));
        let store = ProgressStore::new(storage.clone(), clock.clone());
        (storage, clock, store)
    }

    fn recent(character: &str, timestamp: i64) -> RecentEntry {
        RecentEntry { character: character.to_string(), meanings: vec!["m".into()], timestamp }
    }

    #[test]
    fn test_get_progress_creates_and_persists_default() {
        let (storage, clock, store) = setup();

        let record = store.get_progress().unwrap();
        assert!(record.mastered.is_empty());
        assert_eq!(record.current_level, "N5");
        assert_eq!(record.start_date, clock.now_millis());
        assert_eq!(record.last_studied, None);
        assert!(storage.get(PROGRESS_KEY).unwrap().is_some());

        // Start date is fixed at creation
        clock.advance(Duration::days(3));
        store.mark_mastered("人").unwrap();
        assert_eq!(store.get_progress().unwrap().start_date, record.start_date);
    }

    #[test]
    fn test_mastered_always_subset_of_studied() {
        let (_, clock, store) = setup();

        for (i, c) in ["人", "日", "人", "本", "日", "学"].iter().enumerate() {
            if i % 2 == 0 {
                store.mark_studied(c).unwrap();
            }
            let record = store.mark_mastered(c).unwrap();
            assert!(record.mastered_is_subset_of_studied());
            clock.advance(Duration::hours(5));
        }

        let record = store.get_progress().unwrap();
        assert_eq!(record.mastered.len(), 4);
        assert_eq!(record.studied.len(), 4);
    }

    #[test]
    fn test_mark_mastered_twice_is_idempotent() {
        let (_, _, store) = setup();
        let first = store.mark_mastered("日").unwrap();
        let second = store.mark_mastered("日").unwrap();
        assert_eq!(first.mastered.len(), second.mastered.len());
        assert_eq!(first.studied.len(), second.studied.len());
        assert_eq!(second.streak, 1);
        assert!(store.is_mastered("日"));
        assert!(store.is_studied("日"));
        assert!(!store.is_mastered("月"));
    }

    #[test]
    fn test_streak_across_days() {
        let (_, clock, store) = setup();

        assert_eq!(store.mark_mastered("人").unwrap().streak, 1);
        clock.advance(Duration::hours(1));
        assert_eq!(store.mark_mastered("日").unwrap().streak, 1);
        clock.advance(Duration::days(1));
        assert_eq!(store.mark_mastered("本").unwrap().streak, 2);
        assert_eq!(store.mark_mastered("学").unwrap().streak, 2);
    }

    #[test]
    fn test_study_before_first_mastery_same_day_keeps_streak() {
        let (_, clock, store) = setup();

        let studied = store.mark_studied("日").unwrap();
        assert_eq!(studied.streak, 0);
        assert_eq!(studied.last_studied, Some(clock.now_millis()));

        // The mastery happens on the same day as the study event
        clock.advance(Duration::minutes(5));
        assert_eq!(store.mark_mastered("人").unwrap().streak, 0);

        clock.advance(Duration::days(1));
        assert_eq!(store.mark_mastered("本").unwrap().streak, 1);
    }

    #[test]
    fn test_skip_has_no_other_effects() {
        let (_, _, store) = setup();
        let before = store.get_progress().unwrap();
        let after = store.skip("車").unwrap();
        assert_eq!(after.skipped, vec!["車"]);
        assert_eq!(after.last_studied, before.last_studied);
        assert_eq!(after.streak, before.streak);
        assert_eq!(store.skip("車").unwrap().skipped.len(), 1);
    }

    #[test]
    fn test_reset_replaces_record() {
        let (_, clock, store) = setup();
        store.mark_mastered("人").unwrap();
        clock.advance(Duration::days(2));

        let record = store.reset().unwrap();
        assert!(record.mastered.is_empty());
        assert_eq!(record.streak, 0);
        assert_eq!(record.start_date, clock.now_millis());
        assert_eq!(store.get_progress().unwrap(), record);
    }

    #[test]
    fn test_failed_write_keeps_previous_record() {
        let (storage, _, store) = setup();
        store.mark_mastered("人").unwrap();
        let before = store.get_progress().unwrap();

        storage.set_quota(Some(storage.used_bytes()));
        let err = store.mark_mastered("日").unwrap_err();
        assert!(matches!(err, KanjiError::PersistenceWrite { .. }));

        storage.set_quota(None);
        assert_eq!(store.get_progress().unwrap(), before);
    }

    #[test]
    fn test_corrupt_progress_is_replaced() {
        let (storage, _, store) = setup();
        storage.set(PROGRESS_KEY, "{ broken").unwrap();
        let record = store.get_progress().unwrap();
        assert!(record.mastered.is_empty());
        assert!(load_json::<ProgressRecord>(storage.as_ref(), PROGRESS_KEY).unwrap().is_some());
    }

    #[test]
    fn test_export_import_round_trip() {
        let (_, clock, store) = setup();
        store.mark_mastered("人").unwrap();
        store.mark_studied("日").unwrap();
        store.skip("本").unwrap();
        store.add_to_recent(recent("人", clock.now_millis())).unwrap();
        store.update_setting("theme", json!("dark")).unwrap();

        let blob = store.export_snapshot().unwrap();
        let value: Value = serde_json::from_str(&blob).unwrap();
        assert_eq!(value["version"], 1);
        assert_eq!(value["exportDate"], clock.now_millis());

        let (_, _, fresh) = setup();
        fresh.import_snapshot(&blob).unwrap();
        assert_eq!(fresh.get_progress().unwrap(), store.get_progress().unwrap());
        assert_eq!(fresh.get_recent(50), store.get_recent(50));
        assert_eq!(fresh.settings().theme, "dark");
    }

    #[test]
    fn test_import_unsupported_version_changes_nothing() {
        let (storage, _, store) = setup();
        store.mark_mastered("人").unwrap();
        let before = store.get_progress().unwrap();

        let mut snapshot: Value = serde_json::from_str(&store.export_snapshot().unwrap()).unwrap();
        snapshot["version"] = json!(2);
        snapshot["progress"]["mastered"] = json!(["日", "本"]);

        let err = store.import_snapshot(&snapshot.to_string()).unwrap_err();
        assert!(matches!(err, KanjiError::MalformedSnapshot(_)));
        assert_eq!(store.get_progress().unwrap(), before);

        assert!(store.import_snapshot("{}").is_err());
        assert!(store.import_snapshot("[1, 2]").is_err());
        assert!(storage.get(PROGRESS_KEY).unwrap().is_some());
        assert_eq!(store.get_progress().unwrap(), before);
    }

    #[test]
    fn test_import_is_all_or_nothing() {
        let (storage, _, store) = setup();
        store.mark_mastered("人").unwrap();
        store.add_to_recent(recent("人", 1)).unwrap();
        let before_progress = store.get_progress().unwrap();
        let before_recent = store.get_recent(50);

        let (_, _, other) = setup();
        for c in ["日", "本", "学", "生", "時"] {
            other.mark_mastered(c).unwrap();
            other.add_to_recent(recent(c, 2)).unwrap();
        }
        other.update_setting("padding", json!("x".repeat(400))).unwrap();
        let blob = other.export_snapshot().unwrap();

        // Not enough room for the whole import
        storage.set_quota(Some(storage.used_bytes() + 300));
        assert!(store.import_snapshot(&blob).is_err());

        storage.set_quota(None);
        assert_eq!(store.get_progress().unwrap(), before_progress);
        assert_eq!(store.get_recent(50), before_recent);
        assert!(storage.get(SETTINGS_KEY).unwrap().is_none());
    }

    #[test]
    fn test_import_repairs_subset_invariant() {
        let (_, _, store) = setup();
        let blob = json!({
            "version": 1,
            "exportDate": 0,
            "progress": {
                "mastered": ["人"], "studied": [], "skipped": [],
                "currentLevel": "N4", "startDate": 5, "lastStudied": null,
                "streak": 3, "totalTime": 0
            }
        });
        store.import_snapshot(&blob.to_string()).unwrap();
        let record = store.get_progress().unwrap();
        assert!(record.mastered_is_subset_of_studied());
        assert_eq!(record.current_level, "N4");
        assert_eq!(record.start_date, 5);
        assert!(store.get_recent(10).is_empty());
    }

    #[test]
    fn test_recent_through_store() {
        let (_, _, store) = setup();
        for i in 0..25 {
            store.add_to_recent(recent(&format!("k{}", i), i)).unwrap();
        }
        store.add_to_recent(recent("k10", 99)).unwrap();

        let items = store.get_recent(50);
        assert_eq!(items.len(), 20);
        assert_eq!(items[0].character, "k10");
        assert_eq!(items.iter().filter(|e| e.character == "k10").count(), 1);

        store.clear_recent().unwrap();
        assert!(store.get_recent(50).is_empty());
    }

    #[test]
    fn test_stats() {
        let (_, clock, store) = setup();
        store.get_progress().unwrap();
        clock.advance(Duration::days(2) + Duration::hours(1));
        store.mark_mastered("人").unwrap();
        store.mark_studied("日").unwrap();
        store.add_to_recent(recent("人", 1)).unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.total_mastered, 1);
        assert_eq!(stats.total_studied, 2);
        assert_eq!(stats.current_streak, 1);
        assert_eq!(stats.days_active, 3);
        assert_eq!(stats.average_per_day, 0.7);
        assert_eq!(stats.recent_activity, 1);
        assert_eq!(stats.goal_percentage, 1.0);
    }

    #[test]
    fn test_stats_with_extreme_start_date() {
        let (_, _, store) = setup();
        for start in [i64::MIN, i64::MAX] {
            let blob = json!({
                "version": 1,
                "progress": {
                    "mastered": ["人"], "studied": ["人"], "currentLevel": "N5",
                    "startDate": start, "lastStudied": null, "streak": 1
                }
            })
            .to_string();
            store.import_snapshot(&blob).unwrap();

            let stats = store.stats().unwrap();
            assert!(stats.days_active > 0);
            assert_eq!(stats.average_per_day, 0.0);
            assert_eq!(stats.study_start_date, start);
        }
    }

    #[test]
    fn test_settings_updates_keep_unknown_keys() {
        let (_, _, store) = setup();
        assert_eq!(store.settings(), Settings::default());

        store.update_setting("jlptLevel", json!("N2")).unwrap();
        store.update_setting("widgetColor", json!("teal")).unwrap();

        let settings = store.settings();
        assert_eq!(settings.jlpt_level, "N2");
        assert_eq!(store.settings_map()["widgetColor"], "teal");
        assert_eq!(store.settings_map()["kanjiFont"], "Noto Sans JP");
    }
}
