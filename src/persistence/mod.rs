use std::{
    collections::BTreeMap,
    fs,
    path::{
        Path,
        PathBuf,
    },
    sync::Mutex,
};

use serde::{
    de::DeserializeOwned,
    Serialize,
};
use tracing::{
    debug,
    warn,
};

use crate::core::KanjiError;

const APP_NAME: &str = "kanji-widgets";
const FILE_EXTENSION: &str = "json";

pub fn get_app_data_dir() -> PathBuf {
    if let Some(data_dir) = dirs::data_local_dir() {
        let app_dir = data_dir.join(APP_NAME);
        let _ = fs::create_dir_all(&app_dir);
        app_dir
    } else {
        PathBuf::from(".")
    }
}

/// String key/value store holding every piece of durable learner state.
pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, KanjiError>;

    fn set(&self, key: &str, value: &str) -> Result<(), KanjiError>;

    fn remove(&self, key: &str) -> Result<(), KanjiError>;

    fn keys(&self) -> Result<Vec<String>, KanjiError>;
}

pub fn save_json<T: Serialize>(storage: &dyn Storage, key: &str, data: &T) -> Result<(), KanjiError> {
    let json = serde_json::to_string_pretty(data)?;
    storage.set(key, &json)
}

pub fn load_json<T: DeserializeOwned>(storage: &dyn Storage, key: &str) -> Result<Option<T>, KanjiError> {
    match storage.get(key)? {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}

pub fn load_json_or_default<T: DeserializeOwned + Default>(storage: &dyn Storage, key: &str) -> T {
    match load_json::<T>(storage, key) {
        Ok(Some(data)) => data,
        Ok(None) => T::default(),
        Err(e) => {
            warn!(key, error = %e, "failed to load stored value, using defaults");
            T::default()
        }
    }
}

/// One `<key>.json` file per key inside a data directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, KanjiError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn open_default() -> Result<Self, KanjiError> {
        Self::open(get_app_data_dir())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, KanjiError> {
        let valid = !key.is_empty()
            && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(KanjiError::Custom(format!("Invalid storage key: {:?}", key)));
        }
        Ok(self.root.join(format!("{}.{}", key, FILE_EXTENSION)))
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, KanjiError> {
        let path = self.path_for(key)?;
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(&path)?))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), KanjiError> {
        let path = self.path_for(key)?;
        let tmp_path = path.with_extension("json.tmp");

        // Write-then-rename so the previous value survives a failed write
        fs::write(&tmp_path, value).map_err(|e| KanjiError::persistence(key, e))?;
        if let Err(e) = fs::rename(&tmp_path, &path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(KanjiError::persistence(key, e));
        }

        debug!(key, path = %path.display(), "saved");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), KanjiError> {
        let path = self.path_for(key)?;
        if path.exists() {
            fs::remove_file(&path)?;
            debug!(key, "removed");
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, KanjiError> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(FILE_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                keys.push(stem.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }
}

/// In-process storage with an optional byte quota, like a browser's local storage.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<BTreeMap<String, String>>,
    quota: Mutex<Option<usize>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota: usize) -> Self {
        Self { items: Mutex::new(BTreeMap::new()), quota: Mutex::new(Some(quota)) }
    }

    pub fn set_quota(&self, quota: Option<usize>) {
        if let Ok(mut current) = self.quota.lock() {
            *current = quota;
        }
    }

    pub fn used_bytes(&self) -> usize {
        self.items
            .lock()
            .map(|items| items.iter().map(|(k, v)| k.len() + v.len()).sum())
            .unwrap_or(0)
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, KanjiError> {
        let items = self
            .items
            .lock()
            .map_err(|_| KanjiError::Custom("memory storage lock poisoned".to_string()))?;
        Ok(items.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), KanjiError> {
        let mut items = self.items.lock().map_err(|_| KanjiError::persistence(key, "lock poisoned"))?;
        let quota = self.quota.lock().map(|quota| *quota).unwrap_or(None);

        if let Some(quota) = quota {
            let others: usize =
                items.iter().filter(|(k, _)| k.as_str() != key).map(|(k, v)| k.len() + v.len()).sum();
            if others + key.len() + value.len() > quota {
                return Err(KanjiError::persistence(key, "storage quota exceeded"));
            }
        }

        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), KanjiError> {
        if let Ok(mut items) = self.items.lock() {
            items.remove(key);
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, KanjiError> {
        Ok(self.items.lock().map(|items| items.keys().cloned().collect()).unwrap_or_default())
    }
}
