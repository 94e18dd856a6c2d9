//! Picking which reading to pronounce and handing it to a TTS backend.

use std::process::{
    Command,
    Stdio,
};

use serde::{
    Deserialize,
    Serialize,
};
use tracing::{
    debug,
    info,
};

use crate::core::{
    Example,
    KanjiEntry,
    KanjiError,
};

pub const SPEECH_LANG: &str = "ja-JP";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioPreference {
    #[default]
    Kunyomi,
    Onyomi,
    First,
}

/// The reading the play button speaks for `entry`, falling back to the
/// other reading type when the preferred one is missing.
pub fn reading_to_play(entry: &KanjiEntry, preference: AudioPreference) -> Option<&str> {
    let first_kun = entry.kun_readings.first().map(String::as_str);
    let first_on = entry.on_readings.first().map(String::as_str);

    match preference {
        AudioPreference::Kunyomi => first_kun.or(first_on),
        AudioPreference::Onyomi => first_on.or(first_kun),
        AudioPreference::First => entry.all_readings().next(),
    }
    .filter(|reading| !reading.is_empty())
}

pub fn example_text(example: &Example) -> &str {
    if example.reading.is_empty() {
        &example.word
    } else {
        &example.reading
    }
}

pub trait Speaker: Send + Sync {
    fn speak(&self, text: &str, lang: &str) -> Result<(), KanjiError>;
}

/// Runs an external TTS program with the text as its last argument.
/// Playback is not awaited.
#[derive(Debug, Clone)]
pub struct CommandSpeaker {
    program: String,
    args: Vec<String>,
}

impl CommandSpeaker {
    /// Parses e.g. `"espeak-ng -v ja"`. Returns `None` for a blank command.
    pub fn from_command_line(command_line: &str) -> Option<Self> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self { program, args: parts.collect() })
    }
}

impl Speaker for CommandSpeaker {
    fn speak(&self, text: &str, lang: &str) -> Result<(), KanjiError> {
        debug!(program = %self.program, text, lang, "speaking");
        Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| KanjiError::Speech(format!("failed to start {}: {}", self.program, e)))?;
        Ok(())
    }
}

/// Used when no TTS program is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSpeaker;

impl Speaker for LogSpeaker {
    fn speak(&self, text: &str, lang: &str) -> Result<(), KanjiError> {
        info!(text, lang, "pronunciation (no speech command configured)");
        Ok(())
    }
}
