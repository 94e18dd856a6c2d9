use serde::{
    Deserialize,
    Serialize,
};
use serde_json::Value;

use super::{
    record::ProgressRecord,
    settings::SettingsMap,
};
use crate::core::{
    KanjiError,
    RecentEntry,
};

pub const SNAPSHOT_VERSION: u64 = 1;
pub const SNAPSHOT_RECENT_LIMIT: usize = 50;

/// Versioned export of all durable learner state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub version: u64,
    #[serde(default)]
    pub export_date: i64,
    pub progress: ProgressRecord,
    #[serde(default)]
    pub recent: Vec<RecentEntry>,
    #[serde(default)]
    pub settings: SettingsMap,
}

impl Snapshot {
    pub fn to_json(&self) -> Result<String, KanjiError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Structural validation only; nothing is applied here.
    pub fn parse(blob: &str) -> Result<Self, KanjiError> {
        let value: Value = serde_json::from_str(blob)
            .map_err(|e| KanjiError::MalformedSnapshot(format!("not valid JSON: {}", e)))?;

        let version = value
            .get("version")
            .and_then(Value::as_u64)
            .ok_or_else(|| KanjiError::MalformedSnapshot("missing version".to_string()))?;
        if version != SNAPSHOT_VERSION {
            return Err(KanjiError::MalformedSnapshot(format!(
                "unsupported version {} (expected {})",
                version, SNAPSHOT_VERSION
            )));
        }

        if !value.get("progress").map(Value::is_object).unwrap_or(false) {
            return Err(KanjiError::MalformedSnapshot("missing progress section".to_string()));
        }

        serde_json::from_value(value).map_err(|e| KanjiError::MalformedSnapshot(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn progress_json() -> Value {
        json!({
            "mastered": ["人"], "studied": ["人", "日"], "skipped": [],
            "currentLevel": "N5", "startDate": 1700000000000i64,
            "lastStudied": null, "streak": 1, "totalTime": 0
        })
    }

    #[test]
    fn test_parse_accepts_version_one() {
        let blob = json!({
            "version": 1,
            "exportDate": 1700000001000i64,
            "progress": progress_json(),
            "recent": [{ "character": "人", "meanings": ["person"], "timestamp": 1700000000500i64 }],
            "settings": { "theme": "dark" }
        });

        let snapshot = Snapshot::parse(&blob.to_string()).unwrap();
        assert_eq!(snapshot.progress.studied, vec!["人", "日"]);
        assert_eq!(snapshot.recent.len(), 1);
        assert_eq!(snapshot.settings["theme"], "dark");
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        let cases = [
            "not json at all".to_string(),
            json!({ "progress": progress_json() }).to_string(),
            json!({ "version": 2, "progress": progress_json() }).to_string(),
            json!({ "version": "1", "progress": progress_json() }).to_string(),
            json!({ "version": 1 }).to_string(),
            json!({ "version": 1, "progress": { "mastered": "人" } }).to_string(),
        ];

        for blob in cases {
            let err = Snapshot::parse(&blob).unwrap_err();
            assert!(matches!(err, KanjiError::MalformedSnapshot(_)), "accepted {}", blob);
        }
    }
}
