//! File-backed key/value storage for the configuration store.
//!
//! The whole map lives in one RON file and is rewritten atomically on every
//! change.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use studio_core::{KeyValueStorage, StorageError};
use studio_engine::AtomicFileWriter;
use studio_logging::{studio_info, studio_warn};

pub const STORAGE_FILENAME: &str = ".tc_studio_storage.ron";

pub struct FileStorage {
    writer: AtomicFileWriter,
    items: BTreeMap<String, String>,
}

impl FileStorage {
    /// Opens the store in `dir`. A missing or unreadable file starts empty.
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        let writer = AtomicFileWriter::new(dir);
        let items = load_items(&writer.dir().join(STORAGE_FILENAME));
        Self { writer, items }
    }

    /// Writes `items` and adopts them only once they are on disk, so a failed
    /// write leaves the in-memory view matching the file.
    fn commit(&mut self, items: BTreeMap<String, String>) -> Result<(), StorageError> {
        let pretty = ron::ser::PrettyConfig::new();
        let content = ron::ser::to_string_pretty(&items, pretty)
            .map_err(|err| StorageError::Write(err.to_string()))?;
        self.writer
            .write(STORAGE_FILENAME, &content)
            .map_err(|err| StorageError::Write(err.to_string()))?;
        self.items = items;
        Ok(())
    }
}

impl KeyValueStorage for FileStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.get(key).cloned()
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.items.get(key).map(String::as_str) == Some(value) {
            return Ok(());
        }
        let mut items = self.items.clone();
        items.insert(key.to_string(), value.to_string());
        self.commit(items)
    }

    fn remove_item(&mut self, key: &str) -> Result<(), StorageError> {
        if !self.items.contains_key(key) {
            return Ok(());
        }
        let mut items = self.items.clone();
        items.remove(key);
        self.commit(items)
    }
}

fn load_items(path: &Path) -> BTreeMap<String, String> {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return BTreeMap::new(),
        Err(err) => {
            studio_warn!("Failed to read stored settings from {:?}: {}", path, err);
            return BTreeMap::new();
        }
    };

    match ron::from_str(&content) {
        Ok(items) => {
            studio_info!("Loaded stored settings from {:?}", path);
            items
        }
        Err(err) => {
            studio_warn!("Failed to parse stored settings from {:?}: {}", path, err);
            BTreeMap::new()
        }
    }
}
