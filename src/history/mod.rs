//! Analysis history.
//!
//! An ordered list of past cases, most recent first, capped at a fixed
//! number of entries. Each entry holds the case, its analysis if one
//! completed, and the user's answer if one was given.
//!
//! # Storage Layout
//!
//! ```text
//! ~/.fakao/
//! └── fakao-case-storage.json    # {"version": 1, "entries": [...]}
//! ```

pub mod store;

use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

use crate::domain::{HistoryEntry, UserAnswer};

pub use store::{HistoryStorage, JsonFileStorage, MemoryStorage};

/// Default storage key
pub const DEFAULT_KEY: &str = "fakao-case-storage";

/// Default number of entries kept
pub const DEFAULT_MAX_ENTRIES: usize = 20;

/// History errors
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("failed to access history file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("history file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no history entry matches '{0}'")]
    NotFound(String),

    #[error("'{prefix}' matches {count} history entries, use a longer prefix")]
    Ambiguous { prefix: String, count: usize },

    #[error("history storage lock was poisoned")]
    Poisoned,
}

/// The capped, most-recent-first history list
pub struct History<S: HistoryStorage = JsonFileStorage> {
    storage: S,
    entries: Vec<HistoryEntry>,
    max_entries: usize,
}

impl<S: HistoryStorage> History<S> {
    /// Load the list from storage, dropping anything beyond the cap
    pub fn open(storage: S, max_entries: usize) -> Result<Self, HistoryError> {
        let mut entries = storage.load()?;
        entries.truncate(max_entries);
        Ok(Self {
            storage,
            entries,
            max_entries,
        })
    }

    /// Entries, most recent first
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert at the front and persist. An entry with the same id is replaced.
    pub fn push(&mut self, entry: HistoryEntry) -> Result<(), HistoryError> {
        self.entries.retain(|e| e.id() != entry.id());
        self.entries.insert(0, entry);
        self.entries.truncate(self.max_entries);
        self.persist()
    }

    pub fn get(&self, id: Uuid) -> Option<&HistoryEntry> {
        self.entries.iter().find(|e| e.id() == id)
    }

    /// Resolve an id prefix (as shown by `history list`) to a single entry
    pub fn find_by_prefix(&self, prefix: &str) -> Result<&HistoryEntry, HistoryError> {
        let prefix = prefix.trim().to_lowercase();
        let matches: Vec<_> = self
            .entries
            .iter()
            .filter(|e| !prefix.is_empty() && e.id().to_string().starts_with(&prefix))
            .collect();

        match matches.as_slice() {
            [entry] => Ok(*entry),
            [] => Err(HistoryError::NotFound(prefix)),
            _ => Err(HistoryError::Ambiguous {
                count: matches.len(),
                prefix,
            }),
        }
    }

    /// Remove an entry and persist
    pub fn delete(&mut self, id: Uuid) -> Result<HistoryEntry, HistoryError> {
        let pos = self
            .entries
            .iter()
            .position(|e| e.id() == id)
            .ok_or_else(|| HistoryError::NotFound(id.to_string()))?;
        let removed = self.entries.remove(pos);
        self.persist()?;
        Ok(removed)
    }

    /// Remove all entries and persist
    pub fn clear(&mut self) -> Result<(), HistoryError> {
        self.entries.clear();
        self.persist()
    }

    /// Attach the user's answer to an entry and persist
    pub fn record_answer(&mut self, id: Uuid, answer: UserAnswer) -> Result<(), HistoryError> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.id() == id)
            .ok_or_else(|| HistoryError::NotFound(id.to_string()))?;
        entry.user_answer = Some(answer);
        self.persist()
    }

    /// The underlying storage
    pub fn storage(&self) -> &S {
        &self.storage
    }

    fn persist(&self) -> Result<(), HistoryError> {
        self.storage.save(&self.entries)
    }
}
