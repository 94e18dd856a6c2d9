use std::sync::{
    Arc,
    Mutex,
    MutexGuard,
};

use serde_json::Value;
use tracing::{
    debug,
    info,
    warn,
};

use super::selection::select_next;
use crate::{
    catalog::{
        find_kanji,
        CatalogProvider,
    },
    core::{
        EventSender,
        KanjiEntry,
        KanjiError,
        KanjiEvent,
        RecentEntry,
    },
    progress::{
        ProgressRecord,
        ProgressStore,
    },
};

/// The kanji currently shown to the learner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Presented {
    pub entry: KanjiEntry,
    pub level_complete: bool,
}

#[derive(Debug, Clone)]
pub struct MasteryOutcome {
    pub progress: ProgressRecord,
    pub next: Presented,
}

struct SessionState {
    level: String,
    current: Option<Presented>,
}

/// Chooses what to present next and applies mastery transitions.
///
/// Every operation that changes what is presented holds the session lock
/// for its whole duration, so a caller never sees updated progress paired
/// with a stale kanji or the other way round.
pub struct SessionManager<C: CatalogProvider> {
    store: Arc<ProgressStore>,
    catalog: Arc<C>,
    events: EventSender,
    state: Mutex<SessionState>,
}

impl<C: CatalogProvider> SessionManager<C> {
    pub fn new(store: Arc<ProgressStore>, catalog: Arc<C>, events: EventSender) -> Self {
        let level = store.settings().jlpt_level;
        Self { store, catalog, events, state: Mutex::new(SessionState { level, current: None }) }
    }

    pub fn store(&self) -> &Arc<ProgressStore> {
        &self.store
    }

    pub fn catalog(&self) -> &Arc<C> {
        &self.catalog
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn level(&self) -> String {
        self.lock().level.clone()
    }

    pub fn current(&self) -> Option<Presented> {
        self.lock().current.clone()
    }

    /// A failed provider is treated like an empty catalog.
    fn entries(&self, level: &str) -> Vec<KanjiEntry> {
        match self.catalog.entries_for_level(level) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(level, error = %e, "catalog unavailable");
                Vec::new()
            }
        }
    }

    fn present(
        &self,
        level: &str,
        entries: &[KanjiEntry],
        progress: &ProgressRecord,
    ) -> Result<Presented, KanjiError> {
        let selection = select_next(level, entries, progress)?;
        if selection.level_complete {
            info!(level, "every kanji in the level is mastered, starting over");
            self.events.emit(KanjiEvent::LevelComplete { level: level.to_string() });
        }
        Ok(Presented { entry: selection.entry.clone(), level_complete: selection.level_complete })
    }

    fn reload(&self, state: &mut SessionState) -> Result<Presented, KanjiError> {
        let progress = self.store.get_progress()?;
        let entries = self.entries(&state.level);
        let presented = self.present(&state.level, &entries, &progress)?;
        state.current = Some(presented.clone());
        Ok(presented)
    }

    /// Recomputes the presented kanji from the stored progress and the
    /// stored level, which an import may have replaced.
    pub fn load_current_kanji(&self) -> Result<Presented, KanjiError> {
        let mut state = self.lock();
        state.level = self.store.settings().jlpt_level;
        self.reload(&mut state)
    }

    /// The presented kanji, selecting one first if nothing is shown yet.
    pub fn current_kanji(&self) -> Result<Presented, KanjiError> {
        let mut state = self.lock();
        match &state.current {
            Some(presented) => Ok(presented.clone()),
            None => self.reload(&mut state),
        }
    }

    pub fn mark_current_mastered(&self) -> Result<MasteryOutcome, KanjiError> {
        let character = self
            .current()
            .map(|presented| presented.entry.character)
            .ok_or_else(|| KanjiError::Custom("no kanji is being presented".to_string()))?;
        self.mark_mastered(&character)
    }

    /// Records mastery of `character` and moves on to the next kanji of the
    /// active level as one step. Nothing changes if the level has no entries
    /// or either the progress or the recent-list write fails.
    pub fn mark_mastered(&self, character: &str) -> Result<MasteryOutcome, KanjiError> {
        let mut state = self.lock();

        let entries = self.entries(&state.level);
        if entries.is_empty() {
            return Err(KanjiError::EmptyCatalog { level: state.level.clone() });
        }

        let meanings = entries
            .iter()
            .chain(state.current.iter().map(|presented| &presented.entry))
            .find(|entry| entry.character == character)
            .map(|entry| entry.meanings.clone())
            .unwrap_or_default();
        let recent = RecentEntry {
            character: character.to_string(),
            meanings,
            timestamp: self.store.clock().now_millis(),
        };
        let progress = self.store.record_mastery(character, recent)?;

        let next = self.present(&state.level, &entries, &progress)?;
        state.current = Some(next.clone());

        debug!(character, next = %next.entry.character, "mastery recorded");
        self.events.emit(KanjiEvent::MasteryRecorded { character: character.to_string() });

        Ok(MasteryOutcome { progress, next })
    }

    /// Skipping is only recorded; selection still follows catalog order.
    pub fn skip_current(&self) -> Result<ProgressRecord, KanjiError> {
        let state = self.lock();
        let presented = state
            .current
            .as_ref()
            .ok_or_else(|| KanjiError::Custom("no kanji is being presented".to_string()))?;
        self.store.skip(&presented.entry.character)
    }

    pub fn change_level(&self, level: &str) -> Result<Presented, KanjiError> {
        if !self.catalog.levels().iter().any(|known| known == level) {
            return Err(KanjiError::UnknownLevel(level.to_string()));
        }

        let mut state = self.lock();
        self.store.update_setting("jlptLevel", Value::String(level.to_string()))?;
        self.store.set_current_level(level)?;
        state.level = level.to_string();
        info!(level, "level changed");
        self.reload(&mut state)
    }

    /// Presents `character` from any level, preferring the active one.
    pub fn show_from_recent(&self, character: &str) -> Option<KanjiEntry> {
        let mut state = self.lock();
        let entry = find_kanji(&*self.catalog, character, &state.level)?;
        state.current = Some(Presented { entry: entry.clone(), level_complete: false });
        Some(entry)
    }

    pub fn reset_progress(&self) -> Result<Presented, KanjiError> {
        let mut state = self.lock();
        self.store.reset()?;
        self.reload(&mut state)
    }
}
