use super::error::SaveError;
use crate::dex::DexEntry;
use crate::species::SpeciesCatalog;
use crate::starter::StarterDataEntry;
use crate::CURRENT_GAME_VERSION;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use time::OffsetDateTime;

/// Length every pity counter array is padded to.
pub const PITY_COUNTER_LEN: usize = 4;

/// Account-wide progress: dex, starters, stats, eggs and unlocks
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SystemSaveData {
    /// Random per save, never regenerated
    pub trainer_id: u32,
    pub secret_id: u32,

    pub gender: PlayerGender,

    pub dex_data: BTreeMap<u32, DexEntry>,

    pub starter_data: BTreeMap<u32, StarterDataEntry>,

    pub game_stats: GameStats,

    /// Non-species unlockables (game modes, themes)
    pub unlocks: BTreeMap<String, bool>,

    /// Achievement id -> unlock time (unix millis)
    pub achv_unlocks: BTreeMap<String, u64>,

    /// Voucher id -> unlock time (unix millis)
    pub voucher_unlocks: BTreeMap<String, u64>,

    /// Voucher type -> count held
    pub voucher_counts: BTreeMap<String, u32>,

    /// Pending eggs
    pub eggs: Vec<EggData>,

    pub game_version: String,

    /// Save timestamp (unix milliseconds)
    pub timestamp: u64,

    pub egg_pity: Vec<u32>,
    pub unlock_pity: Vec<u32>,
}

impl SystemSaveData {
    /// All-zero record for every catalog species, no unlocks.
    pub fn empty(catalog: &SpeciesCatalog) -> Self {
        let mut save = Self {
            game_version: CURRENT_GAME_VERSION.to_string(),
            egg_pity: vec![0; PITY_COUNTER_LEN],
            unlock_pity: vec![0; PITY_COUNTER_LEN],
            ..Default::default()
        };
        crate::dex::ledger::fill_missing_entries(&mut save, catalog);
        crate::starter::fill_missing_entries(&mut save, catalog);
        save
    }

    /// Brand new account: fresh trainer ids and the default starters unlocked.
    pub fn fresh<R: Rng + ?Sized>(catalog: &SpeciesCatalog, rng: &mut R) -> Self {
        let mut save = Self::empty(catalog);
        save.trainer_id = rng.gen_range(0..65536);
        save.secret_id = rng.gen_range(0..65536);
        crate::dex::ledger::unlock_default_starters(&mut save, catalog, rng);
        save.timestamp = current_timestamp();
        save
    }

    /// Bump the timestamp, strictly increasing even within one millisecond.
    pub fn touch(&mut self) {
        self.timestamp = current_timestamp().max(self.timestamp.saturating_add(1));
    }

    /// Fill gaps left by older saves and repair broken invariants.
    pub fn consolidate<R: Rng + ?Sized>(&mut self, catalog: &SpeciesCatalog, rng: &mut R) {
        crate::dex::ledger::consolidate(self, catalog, rng);
        crate::starter::fill_missing_entries(self, catalog);
        for pity in [&mut self.egg_pity, &mut self.unlock_pity] {
            if pity.len() < PITY_COUNTER_LEN {
                pity.resize(PITY_COUNTER_LEN, 0);
            }
        }
    }

    pub fn to_json(&self) -> Result<String, SaveError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn seen_species_count(&self) -> usize {
        self.dex_data.values().filter(|e| e.is_seen()).count()
    }

    pub fn caught_species_count(&self) -> usize {
        self.dex_data.values().filter(|e| e.is_caught()).count()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(into = "i8", try_from = "i8")]
pub enum PlayerGender {
    #[default]
    Unset,
    Male,
    Female,
}

impl From<PlayerGender> for i8 {
    fn from(gender: PlayerGender) -> i8 {
        match gender {
            PlayerGender::Unset => -1,
            PlayerGender::Male => 0,
            PlayerGender::Female => 1,
        }
    }
}

impl TryFrom<i8> for PlayerGender {
    type Error = String;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(PlayerGender::Unset),
            0 => Ok(PlayerGender::Male),
            1 => Ok(PlayerGender::Female),
            other => Err(format!("invalid player gender {other}")),
        }
    }
}

/// Counters backfilled by the 1.1.0 migration
pub const RARITY_STAT_COUNTERS: [&str; 9] = [
    "subLegendaryPokemonSeen",
    "subLegendaryPokemonCaught",
    "subLegendaryPokemonHatched",
    "legendaryPokemonSeen",
    "legendaryPokemonCaught",
    "legendaryPokemonHatched",
    "mythicalPokemonSeen",
    "mythicalPokemonCaught",
    "mythicalPokemonHatched",
];

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct GameStats {
    pub play_time: u64,
    pub battles: u32,
    pub classic_sessions_played: u32,
    pub sessions_won: u32,
    pub highest_endless_wave: u32,
    pub pokemon_seen: u32,
    pub pokemon_defeated: u32,
    pub pokemon_caught: u32,
    pub pokemon_hatched: u32,
    pub sub_legendary_pokemon_seen: u32,
    pub sub_legendary_pokemon_caught: u32,
    pub sub_legendary_pokemon_hatched: u32,
    pub legendary_pokemon_seen: u32,
    pub legendary_pokemon_caught: u32,
    pub legendary_pokemon_hatched: u32,
    pub mythical_pokemon_seen: u32,
    pub mythical_pokemon_caught: u32,
    pub mythical_pokemon_hatched: u32,
    pub shiny_pokemon_seen: u32,
    pub shiny_pokemon_caught: u32,
    pub shiny_pokemon_hatched: u32,
    pub trainers_defeated: u32,
    pub eggs_pulled: u32,

    /// Counters this build does not track, kept as-is
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A pending egg
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct EggData {
    pub id: u32,
    pub tier: u8,
    pub source_type: u8,
    pub hatch_waves: u32,
    pub timestamp: u64,
    /// 0 when the species is rolled at hatch time
    pub species: u32,
    pub is_shiny: bool,
    pub variant_tier: u8,
    pub egg_move_index: Option<u8>,
}

pub fn current_timestamp() -> u64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as u64
}
