use std::collections::VecDeque;

use crate::core::RecentEntry;

pub const MAX_RECENT: usize = 20;
pub const DEFAULT_RECENT_VIEW: usize = 10;

/// Most-recent-first list with one entry per character.
#[derive(Debug, Clone)]
pub struct RecentList {
    entries: VecDeque<RecentEntry>,
    max_entries: usize,
}

impl Default for RecentList {
    fn default() -> Self {
        Self::new(MAX_RECENT)
    }
}

impl RecentList {
    pub fn new(max_entries: usize) -> Self {
        Self { entries: VecDeque::new(), max_entries }
    }

    /// Rebuilds a list from stored entries, assumed most-recent-first.
    pub fn from_entries(entries: Vec<RecentEntry>) -> Self {
        let mut list = Self::default();
        for entry in entries.into_iter().rev() {
            list.add(entry);
        }
        list
    }

    pub fn add(&mut self, entry: RecentEntry) {
        self.entries.retain(|existing| existing.character != entry.character);
        self.entries.push_front(entry);

        while self.entries.len() > self.max_entries {
            self.entries.pop_back();
        }
    }

    pub fn get(&self, limit: usize) -> Vec<RecentEntry> {
        self.entries.iter().take(limit).cloned().collect()
    }

    pub fn to_vec(&self) -> Vec<RecentEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(character: &str, timestamp: i64) -> RecentEntry {
        RecentEntry { character: character.to_string(), meanings: vec!["x".into()], timestamp }
    }

    #[test]
    fn test_duplicate_moves_to_front() {
        let mut recent = RecentList::default();
        recent.add(entry("人", 1));
        recent.add(entry("日", 2));
        recent.add(entry("人", 3));

        let items = recent.get(50);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0], entry("人", 3));
        assert_eq!(items[1].character, "日");
    }

    #[test]
    fn test_bounded_to_twenty() {
        let mut recent = RecentList::default();
        for i in 0..25 {
            recent.add(entry(&format!("k{}", i), i));
        }

        let items = recent.get(50);
        assert_eq!(items.len(), MAX_RECENT);
        assert_eq!(items[0].character, "k24");
        assert_eq!(items[19].character, "k5");
        assert_eq!(recent.get(3).len(), 3);
    }

    #[test]
    fn test_from_entries_keeps_order_and_dedups() {
        let stored = vec![entry("本", 5), entry("日", 4), entry("本", 1)];
        let recent = RecentList::from_entries(stored);
        let characters: Vec<_> = recent.to_vec().into_iter().map(|e| e.character).collect();
        assert_eq!(characters, vec!["本", "日"]);
        assert_eq!(recent.get(1)[0].timestamp, 5);
    }
}
