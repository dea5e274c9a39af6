//! Storage backends for the history list.
//!
//! The whole list is one JSON document stored under a single key. The file
//! backend writes it to `<dir>/<key>.json` while holding an exclusive lock.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use fs2::FileExt;
use serde::{Deserialize, Serialize};

use crate::domain::HistoryEntry;

use super::HistoryError;

/// Current on-disk document version
pub const FORMAT_VERSION: u32 = 1;

/// Load/save interface for the persisted history list
pub trait HistoryStorage: Send + Sync {
    /// Load all entries. A store that was never written yields an empty list.
    fn load(&self) -> Result<Vec<HistoryEntry>, HistoryError>;

    /// Replace the stored list
    fn save(&self, entries: &[HistoryEntry]) -> Result<(), HistoryError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct Document {
    version: u32,
    #[serde(default)]
    entries: Vec<HistoryEntry>,
}

/// JSON file storage under a named key
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    /// Store under `<dir>/<key>.json`
    pub fn new(dir: impl AsRef<Path>, key: &str) -> Self {
        Self {
            path: dir.as_ref().join(format!("{}.json", key)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> HistoryError {
        HistoryError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl HistoryStorage for JsonFileStorage {
    fn load(&self) -> Result<Vec<HistoryEntry>, HistoryError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let mut file = File::open(&self.path).map_err(|e| self.io_error(e))?;
        file.lock_shared().map_err(|e| self.io_error(e))?;

        let mut content = String::new();
        file.read_to_string(&mut content)
            .map_err(|e| self.io_error(e))?;

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let document: Document = serde_json::from_str(&content)?;
        tracing::debug!(
            path = %self.path.display(),
            entries = document.entries.len(),
            "Loaded history"
        );
        Ok(document.entries)
    }

    fn save(&self, entries: &[HistoryEntry]) -> Result<(), HistoryError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let document = Document {
            version: FORMAT_VERSION,
            entries: entries.to_vec(),
        };
        let json = serde_json::to_string_pretty(&document)?;

        // Truncate only after the lock is held
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&self.path)
            .map_err(|e| self.io_error(e))?;
        file.lock_exclusive().map_err(|e| self.io_error(e))?;

        file.set_len(0).map_err(|e| self.io_error(e))?;
        file.seek(SeekFrom::Start(0)).map_err(|e| self.io_error(e))?;
        file.write_all(json.as_bytes())
            .map_err(|e| self.io_error(e))?;
        file.flush().map_err(|e| self.io_error(e))?;

        // Lock is released when file is dropped
        Ok(())
    }
}

/// In-process storage that never touches disk. Used by embedders and tests
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<Vec<HistoryEntry>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of what was last saved
    pub fn snapshot(&self) -> Vec<HistoryEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }
}

impl HistoryStorage for MemoryStorage {
    fn load(&self) -> Result<Vec<HistoryEntry>, HistoryError> {
        Ok(self.snapshot())
    }

    fn save(&self, entries: &[HistoryEntry]) -> Result<(), HistoryError> {
        let mut stored = self.entries.lock().map_err(|_| HistoryError::Poisoned)?;
        *stored = entries.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CaseInput;
    use tempfile::TempDir;

    fn entry(text: &str) -> HistoryEntry {
        HistoryEntry::new(CaseInput::new(text, None), None)
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let temp = TempDir::new().unwrap();
        let storage = JsonFileStorage::new(temp.path(), "fakao-case-storage");
        assert!(storage.load().unwrap().is_empty());
    }

    #[test]
    fn test_file_round_trip_creates_directory() {
        let temp = TempDir::new().unwrap();
        let storage = JsonFileStorage::new(temp.path().join("nested"), "cases");
        let entries = vec![entry("第一个案例"), entry("第二个案例")];

        storage.save(&entries).unwrap();
        assert_eq!(storage.path(), temp.path().join("nested").join("cases.json"));
        assert_eq!(storage.load().unwrap(), entries);
    }

    #[test]
    fn test_shorter_save_truncates_file() {
        let temp = TempDir::new().unwrap();
        let storage = JsonFileStorage::new(temp.path(), "cases");

        storage
            .save(&[entry("一"), entry("二"), entry("三")])
            .unwrap();
        storage.save(&[entry("四")]).unwrap();

        let loaded = storage.load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].case.content, "四");
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let storage = JsonFileStorage::new(temp.path(), "cases");
        std::fs::write(storage.path(), "not json").unwrap();

        assert!(matches!(storage.load(), Err(HistoryError::Json(_))));
    }

    #[test]
    fn test_memory_storage() {
        let storage = MemoryStorage::new();
        storage.save(&[entry("案例")]).unwrap();
        assert_eq!(storage.load().unwrap().len(), 1);
    }
}
