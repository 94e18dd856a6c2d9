use std::{
    sync::LazyLock,
    time::Duration,
};

use regex::Regex;
use reqwest::{
    header::USER_AGENT,
    Client,
};
use serde::{
    Deserialize,
    Serialize,
};
use tracing::debug;

use crate::core::{
    Example,
    KanjiError,
};

pub const JISHO_SEARCH_URL: &str = "https://jisho.org/api/v1/search/words";

const MAX_EXAMPLES: usize = 3;
const EXAMPLE_SOURCE_RESULTS: usize = 3;
const SHORT_READING_CHARS: usize = 3;

static JLPT_TAG: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"^jlpt-(n[1-5])$").ok());

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<JishoWord>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JapaneseForm {
    pub word: Option<String>,
    pub reading: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Sense {
    #[serde(default)]
    pub english_definitions: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JishoWord {
    #[serde(default)]
    pub japanese: Vec<JapaneseForm>,
    #[serde(default)]
    pub senses: Vec<Sense>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub jlpt: Vec<String>,
}

impl JishoWord {
    fn mentions(&self, character: &str) -> bool {
        self.japanese.iter().any(|jp| jp.word.as_deref().is_some_and(|w| w.contains(character)))
    }

    fn first_definitions(&self) -> Vec<String> {
        self.senses.first().map(|sense| sense.english_definitions.clone()).unwrap_or_default()
    }
}

/// What a dictionary lookup adds to a built-in entry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Enrichment {
    pub meanings: Vec<String>,
    pub on_readings: Vec<String>,
    pub kun_readings: Vec<String>,
    pub examples: Vec<Example>,
    pub level: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadingKind {
    On,
    Kun,
}

fn contains_katakana(text: &str) -> bool {
    text.chars().any(|c| ('\u{30A1}'..='\u{30F4}').contains(&c))
}

/// Rough on/kun split: on'yomi are short or written in katakana.
fn extract_readings(forms: &[JapaneseForm], kind: ReadingKind) -> Vec<String> {
    let mut readings: Vec<String> = Vec::new();

    for reading in forms.iter().filter_map(|jp| jp.reading.as_deref()) {
        let is_on = reading.chars().count() <= SHORT_READING_CHARS || contains_katakana(reading);
        let wanted = match kind {
            ReadingKind::On => is_on,
            ReadingKind::Kun => !is_on,
        };
        if wanted && !readings.iter().any(|r| r == reading) {
            readings.push(reading.to_string());
        }
    }

    readings
}

fn extract_examples(results: &[JishoWord], character: &str) -> Vec<Example> {
    let mut examples = Vec::new();

    for result in results.iter().take(EXAMPLE_SOURCE_RESULTS) {
        let meaning = result.first_definitions().into_iter().take(2).collect::<Vec<_>>().join(", ");
        for jp in &result.japanese {
            if let (Some(word), Some(reading)) = (&jp.word, &jp.reading) {
                if word.contains(character) {
                    examples.push(Example {
                        word: word.clone(),
                        reading: reading.clone(),
                        meaning: meaning.clone(),
                    });
                }
            }
        }
    }

    examples.truncate(MAX_EXAMPLES);
    examples
}

/// `jlpt-n5` -> `N5`, from either the tag list or the dedicated jlpt list.
fn extract_level(word: &JishoWord) -> Option<String> {
    let re = JLPT_TAG.as_ref()?;
    word.tags
        .iter()
        .chain(word.jlpt.iter())
        .find_map(|tag| re.captures(tag))
        .map(|caps| caps[1].to_uppercase())
}

/// Builds an enrichment from raw search results, or `None` when no result
/// actually contains the character.
pub fn enrichment_from_results(character: &str, results: &[JishoWord]) -> Option<Enrichment> {
    let entry = results.iter().find(|word| word.mentions(character))?;

    Some(Enrichment {
        meanings: entry.first_definitions(),
        on_readings: extract_readings(&entry.japanese, ReadingKind::On),
        kun_readings: extract_readings(&entry.japanese, ReadingKind::Kun),
        examples: extract_examples(results, character),
        level: extract_level(entry),
    })
}

#[derive(Debug, Clone)]
pub struct JishoClient {
    client: Client,
    base_url: String,
}

impl JishoClient {
    pub fn new() -> Result<Self, KanjiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| KanjiError::Custom(format!("HTTP client build failed: {e}")))?;
        Ok(Self { client, base_url: JISHO_SEARCH_URL.to_string() })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    pub async fn search(&self, query: &str) -> Result<Vec<JishoWord>, KanjiError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("keyword", query)])
            .header(USER_AGENT, "kanji-widgets/0.3 (+reqwest)")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(KanjiError::CatalogUnavailable(format!(
                "HTTP error {} from {}",
                response.status(),
                response.url()
            )));
        }

        let body: SearchResponse = response.json().await?;
        debug!(query, results = body.data.len(), "jisho search");
        Ok(body.data)
    }

    pub async fn lookup(&self, character: &str) -> Result<Option<Enrichment>, KanjiError> {
        let results = self.search(character).await?;
        Ok(enrichment_from_results(character, &results))
    }
}
