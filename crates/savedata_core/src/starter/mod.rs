// Starter progression
// Candy, passives, cost reductions, egg moves and win counts per starter line

pub mod costs;
pub mod ledger;

pub use ledger::{StarterCostModifier, StarterLedger};

use crate::save::SystemSaveData;
use crate::species::SpeciesCatalog;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

pub mod abilities {
    pub const ABILITY_1: u8 = 1;
    pub const ABILITY_2: u8 = 1 << 1;
    pub const ABILITY_HIDDEN: u8 = 1 << 2;

    /// Ability slot index (0, 1, 2 = hidden) to its flag.
    pub fn from_index(index: u8) -> Option<u8> {
        match index {
            0 => Some(ABILITY_1),
            1 => Some(ABILITY_2),
            2 => Some(ABILITY_HIDDEN),
            _ => None,
        }
    }
}

pub mod passive {
    pub const UNLOCKED: u8 = 1;
    pub const ENABLED: u8 = 1 << 1;
}

/// Four egg-move slots.
pub const EGG_MOVE_MASK: u8 = 0xF;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Unknown species: {0}")]
    UnknownSpecies(u32),

    #[error("Species {0} has no starter entry")]
    NotAStarter(u32),

    #[error("Not enough candy for species {species}: need {cost}, have {balance}")]
    InsufficientCandy { species: u32, cost: u32, balance: u32 },

    #[error("Passive already unlocked for species {species}")]
    PassiveAlreadyUnlocked { species: u32 },

    #[error("Passive not unlocked for species {species}")]
    PassiveLocked { species: u32 },

    #[error("Cost reduction already at maximum for species {species}")]
    MaxCostReduction { species: u32 },

    #[error("Egg storage full ({max} eggs)")]
    EggCapacity { max: usize },

    #[error("Invalid egg move slot: {index}")]
    InvalidEggMove { index: u8 },
}

/// Moveset saved for a starter: one list, or one list per form index.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum StarterMoveset {
    Flat(Vec<u32>),
    PerForm(BTreeMap<String, Vec<u32>>),
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct StarterDataEntry {
    pub moveset: Option<StarterMoveset>,

    /// Bit per unlocked egg move slot
    pub egg_moves: u8,

    pub candy_count: u32,

    pub friendship: u32,

    /// `abilities::*` flags
    pub ability_attr: u8,

    /// `passive::*` flags
    pub passive_attr: u8,

    /// 0..=VALUE_REDUCTION_MAX
    pub value_reduction: u8,

    pub classic_win_count: u32,
}

impl StarterDataEntry {
    pub fn passive_unlocked(&self) -> bool {
        self.passive_attr & passive::UNLOCKED != 0
    }

    pub fn passive_enabled(&self) -> bool {
        self.passive_attr & passive::ENABLED != 0
    }
}

/// Insert a zeroed starter entry for every starter species missing one.
pub fn fill_missing_entries(save: &mut SystemSaveData, catalog: &SpeciesCatalog) {
    for id in catalog.starter_ids() {
        save.starter_data.entry(id).or_default();
    }
}
