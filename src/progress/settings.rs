use serde::{
    Deserialize,
    Serialize,
};
use serde_json::{
    Map,
    Value,
};
use tracing::warn;

use crate::{
    backup::BackupFrequency,
    core::DEFAULT_LEVEL,
    speech::AudioPreference,
};

pub type SettingsMap = Map<String, Value>;

/// Typed view over the stored settings object. The stored object itself is
/// opaque: keys this struct does not know about are carried in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub jlpt_level: String,
    pub auto_play: bool,
    pub show_furigana: bool,
    pub theme: String,
    pub widget_size: String,
    pub daily_goal: u32,
    pub reminder_time: String,
    pub enable_notifications: bool,
    pub kanji_font: String,
    pub font_size: String,
    pub default_audio: AudioPreference,
    pub local_backup_freq: BackupFrequency,
    pub online_backup_freq: BackupFrequency,
    #[serde(flatten)]
    pub extra: SettingsMap,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            jlpt_level: DEFAULT_LEVEL.to_string(),
            auto_play: false,
            show_furigana: true,
            theme: "light".to_string(),
            widget_size: "medium".to_string(),
            daily_goal: 10,
            reminder_time: "19:00".to_string(),
            enable_notifications: false,
            kanji_font: "Noto Sans JP".to_string(),
            font_size: "medium".to_string(),
            default_audio: AudioPreference::Kunyomi,
            local_backup_freq: BackupFrequency::Daily,
            online_backup_freq: BackupFrequency::Never,
            extra: SettingsMap::new(),
        }
    }
}

impl Settings {
    pub fn from_map(map: &SettingsMap) -> Self {
        match serde_json::from_value(Value::Object(map.clone())) {
            Ok(settings) => settings,
            Err(e) => {
                warn!(error = %e, "stored settings do not match the expected shape, using defaults");
                Self::default()
            }
        }
    }

    pub fn to_map(&self) -> SettingsMap {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => SettingsMap::new(),
        }
    }
}
