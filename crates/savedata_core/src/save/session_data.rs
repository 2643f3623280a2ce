use super::error::SaveError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// One in-progress run, replaced wholesale on every autosave
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionSaveData {
    pub seed: String,

    /// Seconds of play in this run
    pub play_time: u64,

    pub game_mode: u8,

    pub party: Vec<PokemonData>,
    pub enemy_party: Vec<PokemonData>,

    pub modifiers: Vec<ModifierData>,
    pub enemy_modifiers: Vec<ModifierData>,

    pub arena: ArenaData,

    pub pokeball_counts: BTreeMap<String, u32>,

    pub money: u64,
    pub score: u64,
    pub wave_index: u32,
    pub battle_type: u8,

    pub trainer: Option<Value>,

    pub game_version: String,

    /// Save timestamp (unix milliseconds)
    pub timestamp: u64,

    pub challenges: Vec<ChallengeData>,

    pub mystery_encounter_type: Option<i32>,
    pub mystery_encounter_save_data: Option<Value>,

    /// Run state this crate does not interpret
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SessionSaveData {
    pub fn to_json(&self) -> Result<String, SaveError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Species ids of the player's party, in slot order.
    pub fn party_species(&self) -> Vec<u32> {
        self.party.iter().map(|p| p.species).collect()
    }
}

/// Snapshot of one party member
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PokemonData {
    pub id: u32,
    pub player: bool,
    pub species: u32,
    pub nickname: Option<String>,
    pub form_index: u32,
    pub ability_index: u8,
    pub passive: bool,
    pub shiny: bool,
    pub variant: u8,
    pub pokeball: u8,
    pub level: u32,
    pub exp: u64,
    pub hp: u32,
    pub stats: Vec<u32>,
    pub ivs: Vec<u8>,
    pub nature: u8,
    pub moveset: Vec<Value>,
    pub status: Option<Value>,
    pub friendship: u32,
    pub gender: i8,
    pub custom_pokemon_data: Option<CustomPokemonData>,

    /// Battle state this crate does not interpret
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Per-Pokemon overrides; -1 means "not overridden"
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomPokemonData {
    pub sprite_scale: f64,
    pub ability: i32,
    pub passive: i32,
    pub nature: i32,
    pub types: Vec<u8>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for CustomPokemonData {
    fn default() -> Self {
        Self { sprite_scale: -1.0, ability: -1, passive: -1, nature: -1, types: Vec::new(), extra: Map::new() }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ModifierData {
    pub player: bool,
    pub type_id: String,
    pub type_pregen_args: Option<Vec<Value>>,
    pub class_name: String,
    pub args: Vec<Value>,
    pub stack_count: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ArenaData {
    pub biome: u32,
    pub weather: Option<Value>,
    pub terrain: Option<Value>,
    pub tags: Vec<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ChallengeData {
    pub id: u32,
    pub value: u32,
    pub severity: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_pokemon_fields_are_kept() {
        let mon: PokemonData = serde_json::from_value(json!({
            "species": 25,
            "level": 12,
            "fusionSpecies": 4,
            "customPokemonData": { "nature": 3, "hitsRecCount": 2 }
        }))
        .unwrap();

        assert_eq!(mon.species, 25);
        assert_eq!(mon.extra.get("fusionSpecies"), Some(&json!(4)));
        let custom = mon.custom_pokemon_data.as_ref().unwrap();
        assert_eq!(custom.nature, 3);
        assert_eq!(custom.ability, -1);
        assert_eq!(custom.extra.get("hitsRecCount"), Some(&json!(2)));

        let back = serde_json::to_value(&mon).unwrap();
        assert_eq!(back["fusionSpecies"], json!(4));
    }

    #[test]
    fn session_reads_partial_blob() {
        let session: SessionSaveData = serde_json::from_value(json!({
            "seed": "abc",
            "waveIndex": 14,
            "party": [{ "species": 1 }, { "species": 4 }],
            "timestamp": 1700000000000u64
        }))
        .unwrap();

        assert_eq!(session.wave_index, 14);
        assert_eq!(session.party_species(), vec![1, 4]);
        assert!(session.enemy_party.is_empty());
    }
}
