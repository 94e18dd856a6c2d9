use crate::{
    core::{
        KanjiEntry,
        KanjiError,
    },
    progress::ProgressRecord,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection<'a> {
    pub entry: &'a KanjiEntry,
    pub index: usize,
    /// Every entry was mastered and selection wrapped to the first one.
    pub level_complete: bool,
}

/// First entry in catalog order that is not mastered. When all are
/// mastered, wraps to the first entry and flags the level as complete.
pub fn select_next<'a>(
    level: &str,
    entries: &'a [KanjiEntry],
    progress: &ProgressRecord,
) -> Result<Selection<'a>, KanjiError> {
    let first = entries.first().ok_or_else(|| KanjiError::EmptyCatalog { level: level.to_string() })?;

    let next = entries.iter().enumerate().find(|(_, entry)| !progress.is_mastered(&entry.character));

    Ok(match next {
        Some((index, entry)) => Selection { entry, index, level_complete: false },
        None => Selection { entry: first, index: 0, level_complete: true },
    })
}
