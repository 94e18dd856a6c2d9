use serde::{
    Deserialize,
    Serialize,
};

use crate::core::Clock;

/// Durable learner state. Every mutation goes through one of the methods
/// below so `mastered` never holds a character missing from `studied`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    pub mastered: Vec<String>,
    pub studied: Vec<String>,
    #[serde(default)]
    pub skipped: Vec<String>,
    pub current_level: String,
    pub start_date: i64,
    pub last_studied: Option<i64>,
    pub streak: u32,
    #[serde(default)]
    pub total_time: u64,
}

fn insert_unique(set: &mut Vec<String>, character: &str) -> bool {
    if set.iter().any(|c| c == character) {
        false
    } else {
        set.push(character.to_string());
        true
    }
}

impl ProgressRecord {
    pub fn new(level: &str, now: i64) -> Self {
        Self {
            mastered: Vec::new(),
            studied: Vec::new(),
            skipped: Vec::new(),
            current_level: level.to_string(),
            start_date: now,
            last_studied: None,
            streak: 0,
            total_time: 0,
        }
    }

    pub fn is_mastered(&self, character: &str) -> bool {
        self.mastered.iter().any(|c| c == character)
    }

    pub fn is_studied(&self, character: &str) -> bool {
        self.studied.iter().any(|c| c == character)
    }

    pub fn is_skipped(&self, character: &str) -> bool {
        self.skipped.iter().any(|c| c == character)
    }

    pub fn mark_mastered(&mut self, character: &str, clock: &dyn Clock) {
        insert_unique(&mut self.mastered, character);
        insert_unique(&mut self.studied, character);

        let now = clock.now_millis();
        let new_day = match self.last_studied {
            None => true,
            Some(previous) => clock.local_date(previous) != clock.local_date(now),
        };
        if new_day {
            self.streak += 1;
        }
        self.last_studied = Some(now);
    }

    pub fn mark_studied(&mut self, character: &str, clock: &dyn Clock) {
        insert_unique(&mut self.studied, character);
        self.last_studied = Some(clock.now_millis());
    }

    pub fn skip(&mut self, character: &str) {
        insert_unique(&mut self.skipped, character);
    }

    /// Repairs records that came from outside (imports, hand edits):
    /// drops duplicates and adds any mastered character missing from `studied`.
    pub fn normalize(&mut self) {
        for set in [&mut self.mastered, &mut self.studied, &mut self.skipped] {
            let mut seen = std::collections::HashSet::new();
            set.retain(|c| seen.insert(c.clone()));
        }

        let missing: Vec<String> =
            self.mastered.iter().filter(|c| !self.studied.contains(c)).cloned().collect();
        self.studied.extend(missing);
    }

    pub fn mastered_is_subset_of_studied(&self) -> bool {
        self.mastered.iter().all(|c| self.is_studied(c))
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
    use crate::core::ManualClock;

    fn clock() -> ManualClock {
        ManualClock::utc(Utc.with_ymd_and_hms(2024, 5, 10, 9, 0, 0).unwrap())
    }

    #[test]
    fn test_streak_counts_days_not_events() {
        let clock = clock();
        let mut record = ProgressRecord::new("N5", clock.now_millis());

        record.mark_mastered("人", &clock);
        assert_eq!(record.streak, 1); // first ever study counts

        clock.advance(Duration::hours(3));
        record.mark_mastered("日", &clock);
        assert_eq!(record.streak, 1);

        clock.advance(Duration::days(1));
        record.mark_mastered("本", &clock);
        assert_eq!(record.streak, 2);

        record.mark_mastered("学", &clock);
        assert_eq!(record.streak, 2);
    }

    #[test]
    fn test_mastered_is_idempotent() {
        let clock = clock();
        let mut record = ProgressRecord::new("N5", clock.now_millis());

        record.mark_mastered("人", &clock);
        record.mark_mastered("人", &clock);
        assert_eq!(record.mastered, vec!["人"]);
        assert_eq!(record.studied, vec!["人"]);
        assert!(record.mastered_is_subset_of_studied());
    }

    #[test]
    fn test_studied_does_not_touch_streak_or_mastered() {
        let clock = clock();
        let mut record = ProgressRecord::new("N5", clock.now_millis());

        record.mark_studied("車", &clock);
        assert!(record.is_studied("車"));
        assert!(!record.is_mastered("車"));
        assert_eq!(record.streak, 0);
        assert_eq!(record.last_studied, Some(clock.now_millis()));
    }

    #[test]
    fn test_normalize_repairs_subset() {
        let mut record = ProgressRecord::new("N4", 0);
        record.mastered = vec!["思".into(), "言".into(), "思".into()];
        record.studied = vec!["言".into()];

        record.normalize();
        assert_eq!(record.mastered, vec!["思", "言"]);
        assert_eq!(record.studied, vec!["言", "思"]);
        assert!(record.mastered_is_subset_of_studied());
    }

    #[test]
    fn test_wire_format_field_names() {
        let record = ProgressRecord::new("N5", 1_700_000_000_000);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["currentLevel"], "N5");
        assert_eq!(json["startDate"], 1_700_000_000_000i64);
        assert!(json["lastStudied"].is_null());
        assert_eq!(json["totalTime"], 0);
    }
}
