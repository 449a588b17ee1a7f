//! Local persistence for the last captured image and the last used settings.
//!
//! Values are JSON under string keys, mirroring extension local storage.
//! The file-backed store keeps everything in one document:
//!   macOS:   ~/Library/Application Support/liquid-glass/storage.json
//!   Linux:   ~/.config/liquid-glass/storage.json
//!   Windows: %APPDATA%/liquid-glass/storage.json

use base64::{engine::general_purpose::STANDARD, Engine};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use tokio::sync::{Mutex, RwLock};

/// Key of the most recent cropped capture (a PNG data URL).
pub const CROPPED_IMAGE_KEY: &str = "croppedImage";
/// Key of the last used [`crate::settings::UserSettings`].
pub const USER_SETTINGS_KEY: &str = "userSettings";

const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage file is not valid JSON: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("Invalid data URL: {0}")]
    InvalidDataUrl(String),
}

pub trait Store {
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<Value>, StoreError>> + Send;
    /// Overwrites any previous value under `key`.
    fn set(&self, key: &str, value: Value) -> impl Future<Output = Result<(), StoreError>> + Send;
}

impl<T: Store + Sync + ?Sized> Store for &T {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        (**self).set(key, value).await
    }
}

/// In-memory store for tests and single-session hosts.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.values.write().await.insert(key.to_string(), value);
        Ok(())
    }
}

/// One JSON document on disk. Writes go to a temporary file first and are
/// renamed into place.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles.
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// `storage.json` inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join("storage.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<Map<String, Value>, StoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) if text.trim().is_empty() => Ok(Map::new()),
            Ok(text) => match serde_json::from_str::<Value>(&text)? {
                Value::Object(map) => Ok(map),
                _ => {
                    log::warn!("[STORE] {} is not a JSON object, starting fresh", self.path.display());
                    Ok(Map::new())
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Map::new()),
            Err(e) => Err(e.into()),
        }
    }
}

impl Store for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let _guard = self.lock.lock().await;
        Ok(self.read_all().await?.remove(key))
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut all = self.read_all().await?;
        all.insert(key.to_string(), value);

        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(&Value::Object(all))?).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        log::debug!("[STORE] Wrote {} to {}", key, self.path.display());
        Ok(())
    }
}

/// Default data directory under the platform config dir.
pub fn default_data_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("liquid-glass")
}

pub fn to_png_data_url(png: &[u8]) -> String {
    format!("{}{}", PNG_DATA_URL_PREFIX, STANDARD.encode(png))
}

/// Decode a base64 `data:` URL into its bytes. Any media type is accepted.
pub fn decode_data_url(url: &str) -> Result<Vec<u8>, StoreError> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| StoreError::InvalidDataUrl("missing data: scheme".to_string()))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| StoreError::InvalidDataUrl("missing payload".to_string()))?;
    if !meta.ends_with(";base64") {
        return Err(StoreError::InvalidDataUrl("payload is not base64".to_string()));
    }
    STANDARD
        .decode(payload.trim())
        .map_err(|e| StoreError::InvalidDataUrl(e.to_string()))
}
