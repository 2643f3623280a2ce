//! Local-cache vs remote reconciliation.
//!
//! Whole-blob replace ordered by `timestamp`: the strictly newer side wins,
//! ties go to the remote copy. Fields are never merged.

use super::error::SaveError;
use super::format::SystemSaveData;
use super::keys::{SaveCategory, StorageKey};
use super::migration::{declared_version, migrate_session, migrate_system};
use super::session_data::SessionSaveData;
use crate::api::ApiError;
use crate::config::{SaveConfig, StaleClearScope};
use crate::species::SpeciesCatalog;
use crate::store::{EncryptedStore, KvStore};
use rand::Rng;
use serde_json::Value;

/// A save shape the reconciler can parse, compare and persist.
pub trait SaveBlob: Sized {
    const CATEGORY: SaveCategory;

    fn timestamp(&self) -> u64;

    /// Parse and migrate a raw JSON blob.
    fn parse<R: Rng + ?Sized>(json: &str, catalog: &SpeciesCatalog, rng: &mut R) -> Result<Self, SaveError>;

    /// Value used when the remote has no save yet.
    fn fresh<R: Rng + ?Sized>(catalog: &SpeciesCatalog, rng: &mut R) -> Self;

    fn to_json(&self) -> Result<String, SaveError>;
}

impl SaveBlob for SystemSaveData {
    const CATEGORY: SaveCategory = SaveCategory::System;

    fn timestamp(&self) -> u64 {
        self.timestamp
    }

    fn parse<R: Rng + ?Sized>(json: &str, catalog: &SpeciesCatalog, rng: &mut R) -> Result<Self, SaveError> {
        let raw: Value = serde_json::from_str(json)?;
        let declared = declared_version(&raw)?;
        migrate_system(raw, declared, catalog, rng)
    }

    fn fresh<R: Rng + ?Sized>(catalog: &SpeciesCatalog, rng: &mut R) -> Self {
        SystemSaveData::fresh(catalog, rng)
    }

    fn to_json(&self) -> Result<String, SaveError> {
        SystemSaveData::to_json(self)
    }
}

impl SaveBlob for SessionSaveData {
    const CATEGORY: SaveCategory = SaveCategory::Session;

    fn timestamp(&self) -> u64 {
        self.timestamp
    }

    fn parse<R: Rng + ?Sized>(json: &str, _catalog: &SpeciesCatalog, _rng: &mut R) -> Result<Self, SaveError> {
        let raw: Value = serde_json::from_str(json)?;
        let declared = declared_version(&raw)?;
        migrate_session(raw, declared)
    }

    fn fresh<R: Rng + ?Sized>(_catalog: &SpeciesCatalog, _rng: &mut R) -> Self {
        SessionSaveData::default()
    }

    fn to_json(&self) -> Result<String, SaveError> {
        SessionSaveData::to_json(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Neither side had a save
    Fresh,
    UsedLocal,
    UsedRemote,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled<T> {
    pub data: T,
    pub outcome: ReconcileOutcome,
    /// Session slots dropped from the local store as a side effect
    pub cleared_slots: Vec<u8>,
}

impl<T> Reconciled<T> {
    fn new(data: T, outcome: ReconcileOutcome) -> Self {
        Self { data, outcome, cleared_slots: Vec::new() }
    }
}

/// Read the local cache, treating an unreadable blob as absent.
fn load_local<T: SaveBlob, S: KvStore, R: Rng + ?Sized>(
    store: &EncryptedStore<S>,
    key: &StorageKey,
    catalog: &SpeciesCatalog,
    rng: &mut R,
) -> Result<Option<T>, SaveError> {
    let json = match store.get_string(key) {
        Ok(Some(json)) => json,
        Ok(None) => return Ok(None),
        Err(e) if e.is_corrupt_data() => {
            log::warn!("Ignoring unreadable local cache {}: {}", key, e);
            return Ok(None);
        }
        Err(e) => return Err(e),
    };
    match T::parse(&json, catalog, rng) {
        Ok(local) => Ok(Some(local)),
        Err(e) if e.is_corrupt_data() => {
            log::warn!("Ignoring corrupt local cache {}: {}", key, e);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Decide between the local cache under `key` and the remote fetch result.
///
/// Nothing is written when the call fails. On a local win the local blob is
/// re-persisted and, depending on `config.stale_clear_scope`, other session
/// slots are cleared. On a remote win the local cache is overwritten.
pub fn reconcile<T: SaveBlob, S: KvStore, R: Rng + ?Sized>(
    store: &mut EncryptedStore<S>,
    key: &StorageKey,
    remote: Result<String, ApiError>,
    catalog: &SpeciesCatalog,
    config: &SaveConfig,
    rng: &mut R,
) -> Result<Reconciled<T>, SaveError> {
    debug_assert_eq!(key.category, T::CATEGORY);

    let remote_json = match remote {
        Ok(json) => Some(json),
        Err(ApiError::NotFound) => None,
        Err(e) => return Err(e.into()),
    };

    let Some(remote_json) = remote_json else {
        return match load_local::<T, S, R>(store, key, catalog, rng)? {
            Some(local) => {
                log::info!("No remote {} save, using local cache {}", T::CATEGORY, key);
                Ok(Reconciled::new(local, ReconcileOutcome::UsedLocal))
            }
            None => {
                log::info!("No {} save found for {}, starting fresh", T::CATEGORY, key);
                Ok(Reconciled::new(T::fresh(catalog, rng), ReconcileOutcome::Fresh))
            }
        };
    };

    let remote = T::parse(&remote_json, catalog, rng)?;
    let local = load_local::<T, S, R>(store, key, catalog, rng)?;

    match local {
        Some(local) if local.timestamp() > remote.timestamp() => {
            log::info!(
                "Local {} save is newer ({} > {}), using cache {}",
                T::CATEGORY,
                local.timestamp(),
                remote.timestamp(),
                key
            );
            store.put_string(key, &local.to_json()?)?;
            let mut reconciled = Reconciled::new(local, ReconcileOutcome::UsedLocal);
            reconciled.cleared_slots = clear_stale_slots(store, key, config)?;
            Ok(reconciled)
        }
        _ => {
            log::debug!("Using remote {} save for {}", T::CATEGORY, key);
            store.put_string(key, &remote.to_json()?)?;
            Ok(Reconciled::new(remote, ReconcileOutcome::UsedRemote))
        }
    }
}

fn clear_stale_slots<S: KvStore>(
    store: &mut EncryptedStore<S>,
    key: &StorageKey,
    config: &SaveConfig,
) -> Result<Vec<u8>, SaveError> {
    if config.stale_clear_scope == StaleClearScope::Disabled {
        return Ok(Vec::new());
    }
    // A system win leaves no slot of its own to keep
    let keep = (key.category == SaveCategory::Session).then_some(key.slot);
    let cleared = store.clear_other_sessions(&key.username, keep, config.session_slots)?;
    if !cleared.is_empty() {
        log::info!("Cleared stale local session slots {:?} for {}", cleared, key.username);
    }
    Ok(cleared)
}
