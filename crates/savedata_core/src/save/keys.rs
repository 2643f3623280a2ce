//! Local persistence keys.
//!
//! One blob per `(category, username)`, and one per `(category, slot, username)`
//! for session data. Slot 0 omits its numeric suffix.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SaveCategory {
    System,
    Session,
    Settings,
    Tutorials,
    SeenDialogues,
    RunHistory,
}

impl SaveCategory {
    pub const ALL: [SaveCategory; 6] = [
        SaveCategory::System,
        SaveCategory::Session,
        SaveCategory::Settings,
        SaveCategory::Tutorials,
        SaveCategory::SeenDialogues,
        SaveCategory::RunHistory,
    ];

    /// Fixed key prefix used in the local store.
    pub fn key_prefix(self) -> &'static str {
        match self {
            SaveCategory::System => "data",
            SaveCategory::Session => "sessionData",
            SaveCategory::Settings => "settings",
            SaveCategory::Tutorials => "tutorials",
            SaveCategory::SeenDialogues => "seenDialogues",
            SaveCategory::RunHistory => "runHistoryData",
        }
    }

    /// Only the system save is exported with shortened field names.
    pub fn uses_short_keys(self) -> bool {
        self == SaveCategory::System
    }
}

impl fmt::Display for SaveCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SaveCategory::System => "system",
            SaveCategory::Session => "session",
            SaveCategory::Settings => "settings",
            SaveCategory::Tutorials => "tutorials",
            SaveCategory::SeenDialogues => "seen dialogues",
            SaveCategory::RunHistory => "run history",
        };
        f.write_str(name)
    }
}

impl FromStr for SaveCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "system" | "data" => Ok(SaveCategory::System),
            "session" | "sessiondata" => Ok(SaveCategory::Session),
            "settings" => Ok(SaveCategory::Settings),
            "tutorials" => Ok(SaveCategory::Tutorials),
            "seendialogues" | "seen-dialogues" => Ok(SaveCategory::SeenDialogues),
            "runhistory" | "run-history" | "runhistorydata" => Ok(SaveCategory::RunHistory),
            other => Err(format!("unknown save category '{other}'")),
        }
    }
}

/// Address of one blob in the local store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageKey {
    pub category: SaveCategory,
    pub username: String,
    pub slot: u8,
}

impl StorageKey {
    pub fn new(category: SaveCategory, username: &str) -> Self {
        Self { category, username: username.to_string(), slot: 0 }
    }

    pub fn session(slot: u8, username: &str) -> Self {
        Self { category: SaveCategory::Session, username: username.to_string(), slot }
    }

    pub fn system(username: &str) -> Self {
        Self::new(SaveCategory::System, username)
    }

    pub fn run_history(username: &str) -> Self {
        Self::new(SaveCategory::RunHistory, username)
    }

    /// Key string as written to the underlying store.
    pub fn as_key(&self) -> String {
        let prefix = self.category.key_prefix();
        if self.category == SaveCategory::Session && self.slot > 0 {
            format!("{prefix}{}_{}", self.slot, self.username)
        } else {
            format!("{prefix}_{}", self.username)
        }
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_zero_omits_suffix() {
        assert_eq!(StorageKey::session(0, "ash").as_key(), "sessionData_ash");
        assert_eq!(StorageKey::session(3, "ash").as_key(), "sessionData3_ash");
        assert_eq!(StorageKey::system("ash").as_key(), "data_ash");
        assert_eq!(StorageKey::run_history("ash").as_key(), "runHistoryData_ash");
    }

    #[test]
    fn category_parses_from_cli_names() {
        assert_eq!("system".parse::<SaveCategory>(), Ok(SaveCategory::System));
        assert_eq!("run-history".parse::<SaveCategory>(), Ok(SaveCategory::RunHistory));
        assert!("bogus".parse::<SaveCategory>().is_err());
    }
}
