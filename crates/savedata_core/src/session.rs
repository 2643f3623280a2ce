//! Per-account save handle.
//!
//! Owns the local store, the remote client and the loaded system save.
//! Callers must not overlap a save and a load for the same slot; the handle
//! does no locking of its own.

use crate::api::{SaveApi, UpdateAllRequest};
use crate::config::SaveConfig;
use crate::dex::DexLedger;
use crate::save::format::current_timestamp;
use crate::save::{
    reconcile, ReconcileOutcome, Reconciled, RunHistoryLedger, SaveCategory, SaveError, SessionSaveData,
    StorageKey, SystemSaveData,
};
use crate::species::SpeciesCatalog;
use crate::starter::StarterLedger;
use crate::store::portable::{export_portable, import_portable};
use crate::store::{EncryptedStore, KvStore};
use crate::CURRENT_GAME_VERSION;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;

pub struct SaveSession<S: KvStore, A: SaveApi> {
    store: EncryptedStore<S>,
    api: A,
    catalog: Arc<SpeciesCatalog>,
    config: SaveConfig,
    username: String,
    client_session_id: String,
    system: Option<SystemSaveData>,
    rng: StdRng,
}

impl<S: KvStore, A: SaveApi> SaveSession<S, A> {
    pub fn new(
        inner: S,
        api: A,
        catalog: Arc<SpeciesCatalog>,
        config: SaveConfig,
        username: &str,
        client_session_id: &str,
    ) -> Result<Self, SaveError> {
        config.validate()?;
        Ok(Self {
            store: EncryptedStore::new(inner, &config),
            api,
            catalog,
            config,
            username: username.to_string(),
            client_session_id: client_session_id.to_string(),
            system: None,
            rng: StdRng::from_entropy(),
        })
    }

    /// Same as [`SaveSession::new`] with a fixed RNG seed.
    pub fn with_seed(
        inner: S,
        api: A,
        catalog: Arc<SpeciesCatalog>,
        config: SaveConfig,
        username: &str,
        client_session_id: &str,
        seed: u64,
    ) -> Result<Self, SaveError> {
        let mut session = Self::new(inner, api, catalog, config, username, client_session_id)?;
        session.rng = StdRng::seed_from_u64(seed);
        Ok(session)
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn config(&self) -> &SaveConfig {
        &self.config
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn store(&self) -> &EncryptedStore<S> {
        &self.store
    }

    pub fn into_store(self) -> EncryptedStore<S> {
        self.store
    }

    pub fn system(&self) -> Option<&SystemSaveData> {
        self.system.as_ref()
    }

    fn system_mut(&mut self) -> Result<&mut SystemSaveData, SaveError> {
        self.system.as_mut().ok_or(SaveError::NotLoaded)
    }

    fn key_for(&self, category: SaveCategory, slot: u8) -> Result<StorageKey, SaveError> {
        if category == SaveCategory::Session {
            self.config.check_slot(slot)?;
            Ok(StorageKey::session(slot, &self.username))
        } else {
            Ok(StorageKey::new(category, &self.username))
        }
    }

    /// Fetch the remote system save and reconcile it with the local cache.
    pub async fn load_system(&mut self) -> Result<ReconcileOutcome, SaveError> {
        let remote = self.api.get_system(&self.client_session_id).await;
        let key = StorageKey::system(&self.username);
        let reconciled: Reconciled<SystemSaveData> =
            reconcile(&mut self.store, &key, remote, &self.catalog, &self.config, &mut self.rng)?;
        log::info!(
            "Loaded system save for {} ({:?}, {} species caught)",
            self.username,
            reconciled.outcome,
            reconciled.data.caught_species_count()
        );
        self.system = Some(reconciled.data);
        Ok(reconciled.outcome)
    }

    pub async fn load_session(&mut self, slot: u8) -> Result<Reconciled<SessionSaveData>, SaveError> {
        let key = self.key_for(SaveCategory::Session, slot)?;
        let remote = self.api.get_session(slot, &self.client_session_id).await;
        reconcile(&mut self.store, &key, remote, &self.catalog, &self.config, &mut self.rng)
    }

    /// Write the system save locally.
    pub fn persist_system(&mut self) -> Result<(), SaveError> {
        let key = StorageKey::system(&self.username);
        let json = self.system.as_ref().ok_or(SaveError::NotLoaded)?.to_json()?;
        self.store.put_string(&key, &json)
    }

    /// Stamp both saves, write them locally, then send them as one remote update.
    ///
    /// A stale-session answer surfaces as [`SaveError::StaleSession`]; the
    /// local copies are already written at that point and the caller must
    /// reload before saving again.
    pub async fn save_all(&mut self, session: &mut SessionSaveData, slot: u8) -> Result<(), SaveError> {
        let session_key = self.key_for(SaveCategory::Session, slot)?;

        let system = self.system_mut()?;
        system.touch();
        system.game_version = CURRENT_GAME_VERSION.to_string();
        let system_json = system.to_json()?;

        session.timestamp = current_timestamp().max(session.timestamp.saturating_add(1));
        session.game_version = CURRENT_GAME_VERSION.to_string();
        let session_json = session.to_json()?;

        self.store.put_string(&StorageKey::system(&self.username), &system_json)?;
        self.store.put_string(&session_key, &session_json)?;

        let request = UpdateAllRequest {
            system: system_json,
            session: session_json,
            session_slot_id: slot,
            client_session_id: self.client_session_id.clone(),
        };
        self.api.update_all(&request).await.map_err(|e| {
            log::warn!("Remote save for {} slot {} failed: {}", self.username, slot, e);
            SaveError::from(e)
        })
    }

    /// Finish a run: log it in run history, credit wins, free the slot.
    ///
    /// Returns the run history key.
    pub async fn end_run(&mut self, session: SessionSaveData, slot: u8, victory: bool) -> Result<String, SaveError> {
        let session_key = self.key_for(SaveCategory::Session, slot)?;
        let session_json = session.to_json()?;

        if victory {
            let party = session.party_species();
            let catalog = Arc::clone(&self.catalog);
            let system = self.system_mut()?;
            StarterLedger::new(system, &catalog).record_classic_win(&party);
            system.touch();
            self.persist_system()?;
        }

        let mut history = RunHistoryLedger::load(&self.store, &self.username, self.config.run_history_limit)?;
        let run_key = history.append(session, victory);
        history.save(&mut self.store, &self.username)?;

        self.store.remove(&session_key)?;
        self.api.clear_session(slot, &self.client_session_id, &session_json).await?;
        log::info!("Ended run in slot {} for {} (victory: {})", slot, self.username, victory);
        Ok(run_key)
    }

    pub fn run_history(&self) -> Result<RunHistoryLedger, SaveError> {
        RunHistoryLedger::load(&self.store, &self.username, self.config.run_history_limit)
    }

    pub fn dex(&mut self) -> Result<DexLedger<'_>, SaveError> {
        let save = self.system.as_mut().ok_or(SaveError::NotLoaded)?;
        Ok(DexLedger::new(save, &self.catalog))
    }

    pub fn starters(&mut self) -> Result<StarterLedger<'_>, SaveError> {
        let save = self.system.as_mut().ok_or(SaveError::NotLoaded)?;
        Ok(StarterLedger::new(save, &self.catalog))
    }

    /// Portable file for a stored blob; `None` when nothing is stored.
    pub fn export(&self, category: SaveCategory, slot: u8) -> Result<Option<String>, SaveError> {
        let key = self.key_for(category, slot)?;
        export_portable(&self.store, &key, &self.config.export_secret)
    }

    /// Import a portable file. The store is only written once the file has
    /// decrypted, migrated and validated.
    pub fn import(&mut self, blob: &str, category: SaveCategory, slot: u8) -> Result<(), SaveError> {
        let key = self.key_for(category, slot)?;
        let value = import_portable(blob, category, &self.config.export_secret)?;

        if category == SaveCategory::System {
            let mut save: SystemSaveData = serde_json::from_value(value)?;
            save.consolidate(&self.catalog, &mut self.rng);
            self.store.put_string(&key, &save.to_json()?)?;
            self.system = Some(save);
        } else {
            self.store.put_string(&key, &serde_json::to_string(&value)?)?;
        }
        log::info!("Imported {} save for {}", category, self.username);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::MockApi;
    use crate::api::ApiError;
    use crate::save::PokemonData;
    use crate::store::MemoryStore;

    fn session_handle(api: MockApi) -> SaveSession<MemoryStore, MockApi> {
        SaveSession::with_seed(MemoryStore::new(), api, SpeciesCatalog::builtin(), SaveConfig::default(), "ash", "client-1", 3)
            .unwrap()
    }

    fn run_data(species: &[u32]) -> SessionSaveData {
        SessionSaveData {
            party: species.iter().map(|&s| PokemonData { species: s, ..Default::default() }).collect(),
            enemy_party: vec![PokemonData { species: 19, ..Default::default() }],
            wave_index: 12,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn new_account_starts_fresh() {
        let mut handle = session_handle(MockApi::default());
        assert_eq!(handle.load_system().await.unwrap(), ReconcileOutcome::Fresh);

        let system = handle.system().unwrap();
        assert!(system.dex_data[&4].is_caught());
        assert!(!system.dex_data[&25].is_caught());
    }

    #[tokio::test]
    async fn save_all_writes_locally_then_remotely() {
        let mut handle = session_handle(MockApi::default());
        handle.load_system().await.unwrap();

        let mut run = run_data(&[1]);
        handle.save_all(&mut run, 2).await.unwrap();
        let first = handle.system().unwrap().timestamp;
        handle.save_all(&mut run, 2).await.unwrap();
        assert!(handle.system().unwrap().timestamp > first);

        assert!(handle.api().sessions.borrow().contains_key(&2));
        assert!(handle.api().system.borrow().is_some());
        assert_eq!(handle.store().session_slots("ash", 5).unwrap(), vec![2]);
    }

    #[tokio::test]
    async fn save_before_load_is_rejected() {
        let mut handle = session_handle(MockApi::default());
        let err = handle.save_all(&mut run_data(&[1]), 0).await.unwrap_err();
        assert!(matches!(err, SaveError::NotLoaded));
        assert!(matches!(handle.dex(), Err(SaveError::NotLoaded)));
    }

    #[tokio::test]
    async fn stale_session_surfaces_after_local_write() {
        let mut handle = session_handle(MockApi::default());
        handle.load_system().await.unwrap();
        *handle.api().fail_with.borrow_mut() = Some(ApiError::StaleSession);

        let err = handle.save_all(&mut run_data(&[1]), 0).await.unwrap_err();
        assert!(matches!(err, SaveError::StaleSession));
        assert!(handle.store().contains(&StorageKey::session(0, "ash")).unwrap());
    }

    #[tokio::test]
    async fn invalid_slot_is_rejected() {
        let mut handle = session_handle(MockApi::default());
        handle.load_system().await.unwrap();
        assert!(matches!(handle.load_session(9).await, Err(SaveError::InvalidSlot { slot: 9 })));
    }

    #[tokio::test]
    async fn newer_local_session_wins_over_remote() {
        let mut handle = session_handle(MockApi::default());
        handle.load_system().await.unwrap();

        let mut run = run_data(&[7]);
        handle.save_all(&mut run, 1).await.unwrap();
        let mut stale = run.clone();
        stale.timestamp = 1;
        stale.wave_index = 2;
        handle.api().sessions.borrow_mut().insert(1, stale.to_json().unwrap());

        let loaded = handle.load_session(1).await.unwrap();
        assert_eq!(loaded.outcome, ReconcileOutcome::UsedLocal);
        assert_eq!(loaded.data.wave_index, 12);
    }

    #[tokio::test]
    async fn end_run_records_history_and_frees_slot() {
        let mut handle = session_handle(MockApi::default());
        handle.load_system().await.unwrap();

        let mut run = run_data(&[2, 5]);
        handle.save_all(&mut run, 0).await.unwrap();
        let key = handle.end_run(run, 0, true).await.unwrap();

        let history = handle.run_history().unwrap();
        assert!(history.get(&key).unwrap().is_victory);
        assert!(handle.store().session_slots("ash", 5).unwrap().is_empty());
        assert!(handle.api().calls.borrow().contains(&"clear_session:0".to_string()));

        let system = handle.system().unwrap();
        assert_eq!(system.starter_data[&1].classic_win_count, 1);
        assert_eq!(system.starter_data[&4].classic_win_count, 1);
    }

    #[tokio::test]
    async fn export_import_through_the_handle() {
        let mut handle = session_handle(MockApi::default());
        handle.load_system().await.unwrap();
        handle.persist_system().unwrap();
        let original = handle.system().unwrap().clone();

        let blob = handle.export(SaveCategory::System, 0).unwrap().unwrap();
        let mut other = session_handle(MockApi::default());
        other.import(&blob, SaveCategory::System, 0).unwrap();
        assert_eq!(other.system(), Some(&original));
        assert!(other.store().contains(&StorageKey::system("ash")).unwrap());
    }

    #[tokio::test]
    async fn failed_import_leaves_store_untouched() {
        let mut handle = session_handle(MockApi::default());
        handle.load_system().await.unwrap();
        handle.persist_system().unwrap();
        let before = handle.store().inner().get("data_ash").unwrap();

        let foreign = crate::store::portable::encode_portable(
            SaveCategory::System,
            serde_json::to_value(handle.system().unwrap()).unwrap(),
            "someone-else",
        )
        .unwrap();
        assert!(matches!(handle.import(&foreign, SaveCategory::System, 0), Err(SaveError::Decryption { .. })));

        let wrong_category = handle.export(SaveCategory::System, 0).unwrap().unwrap();
        assert!(matches!(
            handle.import(&wrong_category, SaveCategory::Session, 0),
            Err(SaveError::Validation { .. })
        ));
        assert_eq!(handle.store().inner().get("data_ash").unwrap(), before);
        assert!(!handle.store().contains(&StorageKey::session(0, "ash")).unwrap());
    }
}
