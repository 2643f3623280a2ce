use super::error::SaveError;
use super::keys::{SaveCategory, StorageKey};
use super::migration::migrate_blob;
use super::session_data::SessionSaveData;
use crate::store::{EncryptedStore, KvStore};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// One finished run
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RunHistoryEntry {
    pub entry: SessionSaveData,
    pub is_victory: bool,
    pub is_favorite: bool,
}

/// Bounded log of finished runs keyed by the session timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct RunHistoryLedger {
    entries: BTreeMap<String, RunHistoryEntry>,
    limit: usize,
}

/// Eviction order: non-numeric keys first, then ascending numeric value,
/// then key string.
fn eviction_order(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Err(_), Ok(_)) => Ordering::Less,
        (Ok(_), Err(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

impl RunHistoryLedger {
    pub fn new(limit: usize) -> Self {
        Self { entries: BTreeMap::new(), limit: limit.max(1) }
    }

    pub fn from_entries(entries: BTreeMap<String, RunHistoryEntry>, limit: usize) -> Self {
        Self { entries, limit: limit.max(1) }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn get(&self, key: &str) -> Option<&RunHistoryEntry> {
        self.entries.get(key)
    }

    /// Record a finished run, evicting the oldest runs first if the log is full.
    ///
    /// Returns the key the run was stored under.
    pub fn append(&mut self, entry: SessionSaveData, is_victory: bool) -> String {
        let key = entry.timestamp.to_string();
        if !self.entries.contains_key(&key) {
            while self.entries.len() >= self.limit {
                let Some(oldest) = self.oldest_key() else { break };
                log::debug!("Evicting run history entry {}", oldest);
                self.entries.remove(&oldest);
            }
        }
        self.entries.insert(key.clone(), RunHistoryEntry { entry, is_victory, is_favorite: false });
        key
    }

    fn oldest_key(&self) -> Option<String> {
        self.entries.keys().min_by(|a, b| eviction_order(a, b)).cloned()
    }

    /// Flip the favorite flag; `None` when no such run exists.
    pub fn toggle_favorite(&mut self, key: &str) -> Option<bool> {
        let run = self.entries.get_mut(key)?;
        run.is_favorite = !run.is_favorite;
        Some(run.is_favorite)
    }

    pub fn remove(&mut self, key: &str) -> Option<RunHistoryEntry> {
        self.entries.remove(key)
    }

    pub fn entries_newest_first(&self) -> Vec<(&str, &RunHistoryEntry)> {
        let mut runs: Vec<_> = self.entries.iter().map(|(k, v)| (k.as_str(), v)).collect();
        runs.sort_by(|a, b| eviction_order(b.0, a.0));
        runs
    }

    pub fn to_value(&self) -> Result<Value, SaveError> {
        Ok(serde_json::to_value(&self.entries)?)
    }

    /// Parse and migrate a stored run history blob.
    pub fn from_json(json: &str, limit: usize) -> Result<Self, SaveError> {
        let raw: Value = serde_json::from_str(json)?;
        let value = migrate_blob(SaveCategory::RunHistory, raw)?;
        let entries = serde_json::from_value(value)?;
        Ok(Self::from_entries(entries, limit))
    }

    /// Load the user's run history; an empty ledger when none is stored.
    pub fn load<S: KvStore>(store: &EncryptedStore<S>, username: &str, limit: usize) -> Result<Self, SaveError> {
        match store.get_string(&StorageKey::run_history(username))? {
            Some(json) => Self::from_json(&json, limit),
            None => Ok(Self::new(limit)),
        }
    }

    pub fn save<S: KvStore>(&self, store: &mut EncryptedStore<S>, username: &str) -> Result<(), SaveError> {
        let json = serde_json::to_string(&self.entries)?;
        store.put_string(&StorageKey::run_history(username), &json)
    }
}
