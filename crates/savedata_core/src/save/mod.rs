// Save data shapes and lifecycle
// Versioned blobs, migration, reconciliation and run history

pub mod bigmask;
pub mod error;
pub mod format;
pub mod keys;
pub mod migration;
pub mod reconcile;
pub mod rename;
pub mod run_history;
pub mod session_data;
pub mod version;

pub use error::SaveError;
pub use format::{EggData, GameStats, PlayerGender, SystemSaveData};
pub use keys::{SaveCategory, StorageKey};
pub use migration::{migrate_blob, needs_migration, MigrationTable, Migrator};
pub use reconcile::{reconcile, ReconcileOutcome, Reconciled, SaveBlob};
pub use run_history::{RunHistoryEntry, RunHistoryLedger};
pub use session_data::{PokemonData, SessionSaveData};
pub use version::GameVersion;
