use thiserror::Error;

#[derive(Error, Debug)]
pub enum KanjiError {
    #[error("I/O error: {0}")]
    Io(Box<std::io::Error>),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Reqwest error: {0}")]
    Reqwest(Box<reqwest::Error>),

    #[error("No kanji available for level {level}")]
    EmptyCatalog { level: String },

    #[error("Catalog unavailable: {0}")]
    CatalogUnavailable(String),

    #[error("Failed to persist '{key}': {reason}")]
    PersistenceWrite { key: String, reason: String },

    #[error("Invalid snapshot: {0}")]
    MalformedSnapshot(String),

    #[error("Unknown level: {0}")]
    UnknownLevel(String),

    #[error("Speech error: {0}")]
    Speech(String),

    #[error("KanjiError: {0}")]
    Custom(String),
}

impl KanjiError {
    pub fn persistence(key: &str, reason: impl ToString) -> Self {
        KanjiError::PersistenceWrite { key: key.to_string(), reason: reason.to_string() }
    }

    /// Selection against an empty or failed catalog is reported the same way.
    pub fn is_empty_catalog(&self) -> bool {
        matches!(self, KanjiError::EmptyCatalog { .. })
    }
}

impl From<std::io::Error> for KanjiError {
    fn from(error: std::io::Error) -> Self {
        KanjiError::Io(Box::new(error))
    }
}

impl From<reqwest::Error> for KanjiError {
    fn from(error: reqwest::Error) -> Self {
        KanjiError::Reqwest(Box::new(error))
    }
}
