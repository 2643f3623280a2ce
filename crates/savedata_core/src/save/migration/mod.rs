//! Versioned migration of raw save blobs.
//!
//! Each category owns a table of migrators sorted by the version that
//! introduced them. A blob declared at version `v` runs every migrator with a
//! version strictly greater than `v`, in ascending order, on the whole JSON
//! tree. Migrators must be idempotent since the same blob may be parsed twice.

mod session;
mod settings;
mod system;

use super::error::SaveError;
use super::format::SystemSaveData;
use super::keys::SaveCategory;
use super::session_data::SessionSaveData;
use super::version::GameVersion;
use crate::species::SpeciesCatalog;
use crate::CURRENT_GAME_VERSION;
use rand::Rng;
use serde_json::Value;

pub type MigrateFn = fn(&mut Value) -> Result<(), String>;

/// One structural transform, applied to saves older than `version`.
#[derive(Clone, Copy)]
pub struct Migrator {
    pub version: GameVersion,
    pub name: &'static str,
    pub description: &'static str,
    pub apply: MigrateFn,
}

impl Migrator {
    pub const fn new(
        version: GameVersion,
        name: &'static str,
        description: &'static str,
        apply: MigrateFn,
    ) -> Self {
        Self { version, name, description, apply }
    }

    fn run(&self, value: &mut Value) -> Result<(), SaveError> {
        (self.apply)(value).map_err(|reason| SaveError::Migration {
            migrator: self.name,
            version: self.version.to_string(),
            reason,
        })
    }
}

impl std::fmt::Debug for Migrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Migrator").field("version", &self.version).field("name", &self.name).finish()
    }
}

#[derive(Debug, Clone)]
pub struct MigrationTable {
    pub category: SaveCategory,
    migrators: Vec<Migrator>,
}

impl MigrationTable {
    pub fn new(category: SaveCategory, mut migrators: Vec<Migrator>) -> Self {
        // Stable: equal versions keep their declaration order
        migrators.sort_by_key(|m| m.version);
        Self { category, migrators }
    }

    pub fn for_category(category: SaveCategory) -> Self {
        let migrators = match category {
            SaveCategory::System => system::migrators(),
            SaveCategory::Session => session::migrators(),
            SaveCategory::Settings => settings::migrators(),
            SaveCategory::Tutorials | SaveCategory::SeenDialogues | SaveCategory::RunHistory => {
                Vec::new()
            }
        };
        Self::new(category, migrators)
    }

    pub fn migrators(&self) -> &[Migrator] {
        &self.migrators
    }

    /// Migrators a blob declared at `declared` still needs, in run order.
    pub fn pending(&self, declared: GameVersion) -> impl Iterator<Item = &Migrator> + '_ {
        self.migrators.iter().filter(move |m| m.version > declared)
    }

    /// Run every pending migrator. Returns the names applied.
    pub fn apply(&self, value: &mut Value, declared: GameVersion) -> Result<Vec<&'static str>, SaveError> {
        let mut applied = Vec::new();
        for migrator in self.pending(declared) {
            log::debug!("Applying {} migrator '{}' ({})", self.category, migrator.name, migrator.version);
            migrator.run(value)?;
            applied.push(migrator.name);
        }
        Ok(applied)
    }
}

/// Version the blob says it was written by; absent means pre-versioning.
pub fn declared_version(value: &Value) -> Result<GameVersion, SaveError> {
    GameVersion::parse_lenient(value.get("gameVersion").and_then(Value::as_str))
}

/// Bring a raw blob up to the current shape.
///
/// System and session blobs are stamped with the current game version
/// afterwards. Run history entries are migrated as sessions one by one.
pub fn migrate_value(category: SaveCategory, mut value: Value, declared: GameVersion) -> Result<Value, SaveError> {
    if !value.is_object() {
        return Err(SaveError::Migration {
            migrator: "input",
            version: declared.to_string(),
            reason: format!("{category} blob is not a JSON object"),
        });
    }

    let current = GameVersion::current();
    if declared > current {
        log::warn!("Loading {} save from future version {} (current: {})", category, declared, current);
    }

    if category == SaveCategory::RunHistory {
        migrate_run_history(&mut value)?;
        return Ok(value);
    }

    let applied = MigrationTable::for_category(category).apply(&mut value, declared)?;

    if matches!(category, SaveCategory::System | SaveCategory::Session) && declared < current {
        value["gameVersion"] = Value::from(CURRENT_GAME_VERSION);
    }

    if !applied.is_empty() {
        log::info!("Migrated {} save from version {} to {} ({} steps)", category, declared, current, applied.len());
    }
    Ok(value)
}

/// [`migrate_value`] using the blob's own `gameVersion`.
pub fn migrate_blob(category: SaveCategory, value: Value) -> Result<Value, SaveError> {
    let declared = declared_version(&value)?;
    migrate_value(category, value, declared)
}

fn migrate_run_history(value: &mut Value) -> Result<(), SaveError> {
    let Some(entries) = value.as_object_mut() else {
        return Ok(());
    };
    for run in entries.values_mut() {
        let Some(entry) = run.get_mut("entry") else {
            continue;
        };
        if !entry.is_object() {
            continue;
        }
        let declared = declared_version(entry)?;
        *entry = migrate_value(SaveCategory::Session, entry.take(), declared)?;
    }
    Ok(())
}

/// Migrate, type and consolidate a system blob.
pub fn migrate_system<R: Rng + ?Sized>(
    raw: Value,
    declared: GameVersion,
    catalog: &SpeciesCatalog,
    rng: &mut R,
) -> Result<SystemSaveData, SaveError> {
    let value = migrate_value(SaveCategory::System, raw, declared)?;
    let mut save: SystemSaveData = serde_json::from_value(value)?;
    save.consolidate(catalog, rng);
    Ok(save)
}

pub fn migrate_session(raw: Value, declared: GameVersion) -> Result<SessionSaveData, SaveError> {
    let value = migrate_value(SaveCategory::Session, raw, declared)?;
    Ok(serde_json::from_value(value)?)
}

/// Check if a save written by `version` needs migration
pub fn needs_migration(version: GameVersion) -> bool {
    version < GameVersion::current()
}

/// Descriptions of the steps a load would apply, for display
pub fn describe_pending(category: SaveCategory, version: GameVersion) -> Vec<String> {
    MigrationTable::for_category(category)
        .pending(version)
        .map(|m| format!("{}: {}", m.version, m.description))
        .collect()
}
