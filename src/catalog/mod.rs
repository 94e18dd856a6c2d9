//! Where kanji lists come from: built-in tables, a persisted level cache,
//! and best-effort dictionary enrichment.

pub mod cache;
pub mod data;
pub mod jisho;

use std::sync::Arc;

use futures::future::join_all;
use rand::seq::IndexedRandom;
use tracing::{
    info,
    warn,
};

pub use cache::CatalogCache;
pub use jisho::{
    Enrichment,
    JishoClient,
    JishoWord,
};

use crate::{
    core::{
        Clock,
        KanjiEntry,
        KanjiError,
        ALL_LEVELS,
        DEFAULT_LEVEL,
    },
    persistence::Storage,
};

/// Supplies the ordered kanji list for a level. Must return the same order
/// on every call within a session.
pub trait CatalogProvider: Send + Sync {
    fn entries_for_level(&self, level: &str) -> Result<Vec<KanjiEntry>, KanjiError>;

    fn levels(&self) -> Vec<String> {
        ALL_LEVELS.iter().map(|level| level.to_string()).collect()
    }
}

/// Built-in tables only. Unknown levels fall back to N5.
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticCatalog;

impl CatalogProvider for StaticCatalog {
    fn entries_for_level(&self, level: &str) -> Result<Vec<KanjiEntry>, KanjiError> {
        data::level_entries(level)
            .or_else(|| data::level_entries(DEFAULT_LEVEL))
            .ok_or_else(|| KanjiError::CatalogUnavailable(format!("no data for level {}", level)))
    }
}

/// Built-in tables overlaid with cached dictionary enrichment.
///
/// Reads never touch the network; `refresh_level` does the lookups and
/// stores the merged result in the cache.
pub struct KanjiCatalog {
    cache: CatalogCache,
    jisho: Option<JishoClient>,
}

impl KanjiCatalog {
    pub fn new(storage: Arc<dyn Storage>, clock: Arc<dyn Clock>, jisho: Option<JishoClient>) -> Self {
        Self { cache: CatalogCache::new(storage, clock), jisho }
    }

    pub fn offline(storage: Arc<dyn Storage>, clock: Arc<dyn Clock>) -> Self {
        Self::new(storage, clock, None)
    }

    pub fn cache(&self) -> &CatalogCache {
        &self.cache
    }

    /// Looks every built-in entry of `level` up in the dictionary and caches
    /// the merged list. Lookups that fail keep the built-in entry.
    pub async fn refresh_level(&self, level: &str) -> Result<Vec<KanjiEntry>, KanjiError> {
        let base = StaticCatalog.entries_for_level(level)?;

        let Some(jisho) = &self.jisho else {
            return Ok(base);
        };

        let lookups = base.iter().map(|entry| jisho.lookup(&entry.character));
        let results = join_all(lookups).await;

        let mut enriched_count = 0;
        let entries: Vec<KanjiEntry> = base
            .into_iter()
            .zip(results)
            .map(|(entry, result)| match result {
                Ok(Some(enrichment)) => {
                    enriched_count += 1;
                    merge_enrichment(entry, enrichment)
                }
                Ok(None) => entry,
                Err(e) => {
                    warn!(character = %entry.character, error = %e, "failed to enhance kanji");
                    entry
                }
            })
            .collect();

        self.cache.put(level, entries.clone())?;
        info!(level, enriched = enriched_count, total = entries.len(), "catalog refreshed");
        Ok(entries)
    }

    /// Raw dictionary search; empty when offline or on failure.
    pub async fn search(&self, query: &str) -> Vec<JishoWord> {
        let Some(jisho) = &self.jisho else {
            return Vec::new();
        };
        match jisho.search(query).await {
            Ok(results) => results,
            Err(e) => {
                warn!(query, error = %e, "dictionary search failed");
                Vec::new()
            }
        }
    }
}

impl CatalogProvider for KanjiCatalog {
    fn entries_for_level(&self, level: &str) -> Result<Vec<KanjiEntry>, KanjiError> {
        match self.cache.get(level) {
            Some(entries) if !entries.is_empty() => Ok(entries),
            _ => StaticCatalog.entries_for_level(level),
        }
    }
}

/// Enrichment fields replace built-in ones only when they carry data.
pub fn merge_enrichment(mut entry: KanjiEntry, enrichment: Enrichment) -> KanjiEntry {
    if !enrichment.meanings.is_empty() {
        entry.meanings = enrichment.meanings;
    }
    if !enrichment.on_readings.is_empty() {
        entry.on_readings = enrichment.on_readings;
    }
    if !enrichment.kun_readings.is_empty() {
        entry.kun_readings = enrichment.kun_readings;
    }
    if !enrichment.examples.is_empty() {
        entry.examples = enrichment.examples;
    }
    if let Some(level) = enrichment.level {
        entry.level = level;
    }
    entry
}

/// Searches `preferred_level` first, then every level easiest-first.
pub fn find_kanji(
    catalog: &dyn CatalogProvider,
    character: &str,
    preferred_level: &str,
) -> Option<KanjiEntry> {
    let levels = std::iter::once(preferred_level.to_string()).chain(catalog.levels());

    for level in levels {
        let Ok(entries) = catalog.entries_for_level(&level) else {
            continue;
        };
        if let Some(entry) = entries.into_iter().find(|entry| entry.character == character) {
            return Some(entry);
        }
    }
    None
}

pub fn random_kanji(catalog: &dyn CatalogProvider, level: &str) -> Option<KanjiEntry> {
    let entries = catalog.entries_for_level(level).ok()?;
    entries.choose(&mut rand::rng()).cloned()
}

pub fn kanji_count(level: &str) -> usize {
    data::level_count(level)
}
