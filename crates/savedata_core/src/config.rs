use crate::save::SaveError;
use serde::{Deserialize, Serialize};
use std::{env, fs};

pub const CONFIG_PATH_ENV: &str = "SAVEDATA_CONFIG_PATH";

/// Which local session slots a "local copy wins" reconciliation clears.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaleClearScope {
    /// Every session slot except the one being loaded
    #[default]
    AllOtherSlots,
    /// Leave other slots alone
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveConfig {
    /// Secret for blobs in the local store
    pub local_secret: String,
    /// Secret for portable export files
    pub export_secret: String,
    /// Skip encryption (checksums only) for trusted/offline builds
    pub trusted_mode: bool,
    /// lz4-compress local blobs
    pub compress_local: bool,
    pub run_history_limit: usize,
    pub session_slots: u8,
    pub stale_clear_scope: StaleClearScope,
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self {
            local_secret: "x0i2O7WRiANTqPmZ".to_string(),
            export_secret: "savedata-export".to_string(),
            trusted_mode: false,
            compress_local: true,
            run_history_limit: 25,
            session_slots: 5,
            stale_clear_scope: StaleClearScope::AllOtherSlots,
        }
    }
}

impl SaveConfig {
    pub fn from_json(json: &str) -> Result<Self, SaveError> {
        serde_json::from_str(json).map_err(|e| SaveError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), SaveError> {
        if !self.trusted_mode && self.local_secret.is_empty() {
            return Err(SaveError::Config("local_secret must not be empty".into()));
        }
        if self.export_secret.is_empty() {
            return Err(SaveError::Config("export_secret must not be empty".into()));
        }
        if self.run_history_limit == 0 {
            return Err(SaveError::Config("run_history_limit must be at least 1".into()));
        }
        if self.session_slots == 0 {
            return Err(SaveError::Config("session_slots must be at least 1".into()));
        }
        Ok(())
    }

    /// Slot index is within the configured slot count.
    pub fn check_slot(&self, slot: u8) -> Result<(), SaveError> {
        if slot >= self.session_slots {
            return Err(SaveError::InvalidSlot { slot });
        }
        Ok(())
    }

    /// Defaults, overridden by the JSON file named in `SAVEDATA_CONFIG_PATH`
    /// when that variable is set.
    pub fn from_env() -> Result<Self, SaveError> {
        let Ok(path) = env::var(CONFIG_PATH_ENV) else {
            return Ok(Self::default());
        };

        let path = path.trim();
        if path.is_empty() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| {
            SaveError::Config(format!("Failed to read config file from {CONFIG_PATH_ENV}='{path}': {e}"))
        })?;

        let config = Self::from_json(&content).map_err(|e| {
            SaveError::Config(format!("Failed to parse config JSON from {CONFIG_PATH_ENV}='{path}': {e}"))
        })?;

        config.validate().map_err(|e| {
            SaveError::Config(format!("Invalid config from {CONFIG_PATH_ENV}='{path}': {e}"))
        })?;

        log::info!("Loaded save config from {}", path);
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = SaveConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.run_history_limit, 25);
        assert_eq!(config.stale_clear_scope, StaleClearScope::AllOtherSlots);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = SaveConfig::from_json(r#"{ "trusted_mode": true, "stale_clear_scope": "disabled" }"#).unwrap();
        assert!(config.trusted_mode);
        assert_eq!(config.stale_clear_scope, StaleClearScope::Disabled);
        assert_eq!(config.session_slots, 5);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let config = SaveConfig { run_history_limit: 0, ..Default::default() };
        assert!(matches!(config.validate(), Err(SaveError::Config(_))));
        assert!(SaveConfig::from_json("{ not json").is_err());
    }

    #[test]
    fn slot_bounds_follow_slot_count() {
        let config = SaveConfig::default();
        assert!(config.check_slot(4).is_ok());
        assert!(matches!(config.check_slot(5), Err(SaveError::InvalidSlot { slot: 5 })));
    }
}
