use serde::{
    Deserialize,
    Serialize,
};

pub const DEFAULT_LEVEL: &str = "N5";

/// JLPT levels in study order, easiest first.
pub const ALL_LEVELS: &[&str] = &["N5", "N4", "N3", "N2", "N1"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Example {
    pub word: String,
    pub reading: String,
    pub meaning: String, // English gloss
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KanjiEntry {
    pub character: String,
    pub meanings: Vec<String>,
    #[serde(rename = "onyomi")]
    pub on_readings: Vec<String>,
    #[serde(rename = "kunyomi")]
    pub kun_readings: Vec<String>,
    #[serde(rename = "jlpt")]
    pub level: String,
    #[serde(default)]
    pub examples: Vec<Example>,
}

impl KanjiEntry {
    pub fn meanings_label(&self) -> String {
        self.meanings.join(", ")
    }

    /// On'yomi followed by kun'yomi, as displayed in the full widget.
    pub fn all_readings(&self) -> impl Iterator<Item = &str> {
        self.on_readings.iter().chain(self.kun_readings.iter()).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentEntry {
    pub character: String,
    pub meanings: Vec<String>,
    pub timestamp: i64, // epoch millis
}

impl RecentEntry {
    pub fn from_entry(entry: &KanjiEntry, timestamp: i64) -> Self {
        Self { character: entry.character.clone(), meanings: entry.meanings.clone(), timestamp }
    }
}

pub fn is_known_level(level: &str) -> bool {
    ALL_LEVELS.contains(&level)
}
