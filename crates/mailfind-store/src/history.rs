//! Search history - bounded, newest-first log of submitted searches

use std::sync::Arc;

use chrono::{DateTime, Utc};
use mailfind_core::{EntryId, SearchParams};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::storage::{load_records, save_records, StoragePort, HISTORY_KEY};

/// One submitted search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: EntryId,
    pub params: SearchParams,
    pub timestamp: DateTime<Utc>,
}

/// Most-recent-first history capped at `max_items`
///
/// Every mutation is written through to storage immediately. The in-memory
/// list stays authoritative when a write fails.
pub struct HistoryStore {
    storage: Arc<dyn StoragePort>,
    max_items: usize,
    entries: Vec<HistoryEntry>,
}

impl HistoryStore {
    /// Default cap on stored entries
    pub const DEFAULT_MAX_ITEMS: usize = 10;

    /// Load the persisted history
    ///
    /// Missing or malformed data yields an empty history.
    pub fn load(storage: Arc<dyn StoragePort>, max_items: usize) -> Self {
        let mut entries: Vec<HistoryEntry> = load_records(storage.as_ref(), HISTORY_KEY);
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        entries.truncate(max_items);

        debug!("Loaded {} history entries", entries.len());
        Self {
            storage,
            max_items,
            entries,
        }
    }

    /// Entries, newest first
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_items(&self) -> usize {
        self.max_items
    }

    pub fn get(&self, id: EntryId) -> Option<&HistoryEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Prepend a new entry, evicting the oldest beyond the cap
    pub fn record_search(&mut self, params: SearchParams) -> Result<EntryId> {
        self.record_search_at(params, Utc::now())
    }

    pub fn record_search_at(&mut self, params: SearchParams, timestamp: DateTime<Utc>) -> Result<EntryId> {
        let id = EntryId::new();
        self.entries.insert(0, HistoryEntry { id, params, timestamp });
        if self.entries.len() > self.max_items {
            let evicted = self.entries.len() - self.max_items;
            self.entries.truncate(self.max_items);
            debug!("Evicted {} history entries over cap {}", evicted, self.max_items);
        }
        self.persist()?;
        Ok(id)
    }

    /// Remove one entry; returns whether it existed
    pub fn remove_entry(&mut self, id: EntryId) -> Result<bool> {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        if self.entries.len() == before {
            return Ok(false);
        }
        self.persist()?;
        Ok(true)
    }

    /// Empty the history and notify `on_clear`
    pub fn clear_all(&mut self, on_clear: impl FnOnce()) -> Result<()> {
        self.entries.clear();
        let persisted = self.persist();
        on_clear();
        persisted
    }

    /// Hand an entry's params to `on_select` without mutating anything
    pub fn select_entry(&self, id: EntryId, on_select: impl FnOnce(&SearchParams)) -> bool {
        match self.get(id) {
            Some(entry) => {
                on_select(&entry.params);
                true
            }
            None => false,
        }
    }

    fn persist(&self) -> Result<()> {
        save_records(self.storage.as_ref(), HISTORY_KEY, &self.entries)
    }
}
