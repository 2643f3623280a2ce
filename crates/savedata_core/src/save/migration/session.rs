use super::Migrator;
use crate::save::version::GameVersion;
use serde_json::{Map, Value};

/// Old modifier class name -> current name
const MODIFIER_RENAMES: [(&str, &str); 3] = [
    ("PokemonBaseStatModifier", "BaseStatModifier"),
    ("PokemonResetNegativeStatStageModifier", "ResetNegativeStatStageModifier"),
    ("TempBattleStatBoosterModifier", "TempStatStageBoosterModifier"),
];

pub(super) fn migrators() -> Vec<Migrator> {
    vec![
        Migrator::new(
            GameVersion::new(1, 0, 4),
            "rename_modifier_classes",
            "Rename stat modifier classes",
            rename_modifier_classes,
        ),
        Migrator::new(
            GameVersion::new(1, 7, 0),
            "move_custom_pokemon_data",
            "Move nature overrides and encounter data into custom data",
            move_custom_pokemon_data,
        ),
    ]
}

fn rename_modifier_classes(value: &mut Value) -> Result<(), String> {
    for key in ["modifiers", "enemyModifiers"] {
        let Some(list) = value.get_mut(key).and_then(Value::as_array_mut) else {
            continue;
        };
        for modifier in list.iter_mut().filter_map(Value::as_object_mut) {
            let Some(class_name) = modifier.get("className").and_then(Value::as_str) else {
                continue;
            };
            if let Some((_, new)) = MODIFIER_RENAMES.iter().find(|(old, _)| *old == class_name) {
                modifier.insert("className".into(), Value::from(*new));
            }
        }
    }
    Ok(())
}

fn move_custom_pokemon_data(value: &mut Value) -> Result<(), String> {
    for key in ["party", "enemyParty"] {
        let Some(list) = value.get_mut(key).and_then(Value::as_array_mut) else {
            continue;
        };
        for pokemon in list.iter_mut().filter_map(Value::as_object_mut) {
            move_one(pokemon)?;
        }
    }
    Ok(())
}

fn move_one(pokemon: &mut Map<String, Value>) -> Result<(), String> {
    let nature_override = pokemon.get("natureOverride").and_then(Value::as_i64).unwrap_or(-1);
    let encounter_data = pokemon.remove("mysteryEncounterPokemonData");

    let custom = pokemon
        .entry("customPokemonData")
        .or_insert_with(|| Value::Object(Map::new()));
    if custom.is_null() {
        *custom = Value::Object(Map::new());
    }
    let custom = custom.as_object_mut().ok_or("customPokemonData is not an object")?;

    if nature_override >= 0 {
        custom.insert("nature".into(), Value::from(nature_override));
    }
    if let Some(Value::Object(fields)) = encounter_data {
        for (field, v) in fields {
            custom.entry(field).or_insert(v);
        }
    }

    if nature_override >= 0 {
        pokemon.insert("natureOverride".into(), Value::from(-1));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renames_only_known_classes() {
        let mut session = json!({
            "modifiers": [{ "className": "PokemonBaseStatModifier" }, { "className": "ExpBoosterModifier" }],
            "enemyModifiers": [{ "className": "TempBattleStatBoosterModifier" }]
        });
        rename_modifier_classes(&mut session).unwrap();
        assert_eq!(session["modifiers"][0]["className"], json!("BaseStatModifier"));
        assert_eq!(session["modifiers"][1]["className"], json!("ExpBoosterModifier"));
        assert_eq!(session["enemyModifiers"][0]["className"], json!("TempStatStageBoosterModifier"));
    }

    #[test]
    fn nature_override_moves_into_custom_data() {
        let mut session = json!({
            "party": [{ "natureOverride": 0, "customPokemonData": { "ability": 3 } }]
        });
        move_custom_pokemon_data(&mut session).unwrap();
        let mon = &session["party"][0];
        assert_eq!(mon["natureOverride"], json!(-1));
        assert_eq!(mon["customPokemonData"], json!({ "ability": 3, "nature": 0 }));
    }

    #[test]
    fn encounter_data_does_not_clobber_existing_fields() {
        let mut session = json!({
            "enemyParty": [{
                "customPokemonData": null,
                "mysteryEncounterPokemonData": { "spriteScale": 2.0, "types": [1] }
            }]
        });
        move_custom_pokemon_data(&mut session).unwrap();
        let mon = &session["enemyParty"][0];
        assert_eq!(mon["customPokemonData"], json!({ "spriteScale": 2.0, "types": [1] }));
        assert!(mon.get("mysteryEncounterPokemonData").is_none());
        assert!(mon.get("natureOverride").is_none());
    }
}
