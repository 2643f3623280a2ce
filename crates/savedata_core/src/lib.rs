//! # savedata_core - Persistent Player Save Data
//!
//! This library owns everything that survives between play sessions:
//! the dex unlock bitmasks, the starter progression ledger, versioned
//! migration of old save blobs, reconciliation between the local cache
//! and the remote copy, and the encrypted key/value persistence layer.
//!
//! ## Features
//! - Big-integer dex attribute masks with an explicit wire format
//! - Ordered, idempotent per-category migration tables
//! - Timestamp-ordered whole-blob reconciliation
//! - AES-GCM encrypted local store plus a portable export format

pub mod api;
pub mod config;
pub mod dex;
pub mod save;
pub mod session;
pub mod species;
pub mod starter;
pub mod store;

pub use api::{ApiError, OfflineApi, SaveApi, UpdateAllRequest};
pub use config::{SaveConfig, StaleClearScope};
pub use dex::{DexAttrProps, DexEntry, DexLedger, Nature, VariantTier};
pub use save::{
    GameVersion, ReconcileOutcome, Reconciled, RunHistoryEntry, RunHistoryLedger, SaveCategory,
    SaveError, SessionSaveData, StorageKey, SystemSaveData,
};
pub use session::SaveSession;
pub use species::SpeciesCatalog;
pub use starter::{LedgerError, StarterDataEntry, StarterLedger};
pub use store::{EncryptedStore, FileStore, KvStore, MemoryStore};

/// Version the in-memory save shape corresponds to.
pub const CURRENT_GAME_VERSION: &str = "1.10.0";
