use super::Migrator;
use crate::save::bigmask;
use crate::save::format::{PITY_COUNTER_LEN, RARITY_STAT_COUNTERS};
use crate::save::version::GameVersion;
use crate::starter::{abilities, EGG_MOVE_MASK};
use num_traits::Zero;
use serde_json::{Map, Value};

pub(super) fn migrators() -> Vec<Migrator> {
    vec![
        Migrator::new(
            GameVersion::new(1, 0, 4),
            "migrate_ability_data",
            "Give caught starters their first ability",
            migrate_ability_data,
        ),
        Migrator::new(
            GameVersion::new(1, 0, 4),
            "fix_starter_data",
            "Repair starter win counts and egg move masks",
            fix_starter_data,
        ),
        Migrator::new(
            GameVersion::new(1, 1, 0),
            "fix_legendary_stats",
            "Add legendary, sub-legendary and mythical counters",
            fix_legendary_stats,
        ),
        Migrator::new(
            GameVersion::new(1, 9, 0),
            "fill_pity_counters",
            "Pad egg and unlock pity counters",
            fill_pity_counters,
        ),
    ]
}

fn starter_entries(value: &mut Value) -> Option<&mut Map<String, Value>> {
    value.get_mut("starterData").and_then(Value::as_object_mut)
}

fn migrate_ability_data(value: &mut Value) -> Result<(), String> {
    let caught: Vec<String> = match value.get("dexData").and_then(Value::as_object) {
        Some(dex) => {
            let mut caught = Vec::new();
            for (id, entry) in dex {
                let raw = entry.get("caughtAttr").unwrap_or(&Value::Null);
                let mask = bigmask::from_value(raw)
                    .ok_or_else(|| format!("species {id} has an unreadable caughtAttr"))?;
                if !mask.is_zero() {
                    caught.push(id.clone());
                }
            }
            caught
        }
        None => return Ok(()),
    };

    let Some(starters) = starter_entries(value) else {
        return Ok(());
    };
    for id in caught {
        let Some(Value::Object(starter)) = starters.get_mut(&id) else {
            continue;
        };
        let ability = starter.get("abilityAttr").and_then(Value::as_u64).unwrap_or(0);
        if ability == 0 {
            starter.insert("abilityAttr".into(), Value::from(abilities::ABILITY_1));
        }
    }
    Ok(())
}

fn fix_starter_data(value: &mut Value) -> Result<(), String> {
    let Some(starters) = starter_entries(value) else {
        return Ok(());
    };
    for starter in starters.values_mut().filter_map(Value::as_object_mut) {
        if starter.get("classicWinCount").map_or(true, Value::is_null) {
            starter.insert("classicWinCount".into(), Value::from(0));
        }
        let egg_moves = starter.get("eggMoves").and_then(Value::as_u64).unwrap_or(0);
        starter.insert("eggMoves".into(), Value::from(egg_moves & u64::from(EGG_MOVE_MASK)));
    }
    Ok(())
}

fn fix_legendary_stats(value: &mut Value) -> Result<(), String> {
    let root = value.as_object_mut().ok_or("system save is not an object")?;
    let stats = root.entry("gameStats").or_insert_with(|| Value::Object(Map::new()));
    if stats.is_null() {
        *stats = Value::Object(Map::new());
    }
    let stats = stats.as_object_mut().ok_or("gameStats is not an object")?;
    for counter in RARITY_STAT_COUNTERS {
        if stats.get(counter).map_or(true, Value::is_null) {
            stats.insert(counter.into(), Value::from(0));
        }
    }
    Ok(())
}

fn fill_pity_counters(value: &mut Value) -> Result<(), String> {
    let root = value.as_object_mut().ok_or("system save is not an object")?;
    for key in ["eggPity", "unlockPity"] {
        let counter = root.entry(key).or_insert_with(|| Value::Array(Vec::new()));
        if !counter.is_array() {
            *counter = Value::Array(Vec::new());
        }
        if let Value::Array(items) = counter {
            while items.len() < PITY_COUNTER_LEN {
                items.push(Value::from(0));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ability_backfill_only_touches_caught_starters() {
        let mut save = json!({
            "dexData": {
                "1": { "caughtAttr": "340282366920938463463374607431768211456" },
                "4": { "caughtAttr": 0 },
                "7": { "caughtAttr": 149 }
            },
            "starterData": {
                "1": { "abilityAttr": 0 },
                "4": {},
                "7": { "abilityAttr": 4 }
            }
        });
        migrate_ability_data(&mut save).unwrap();

        assert_eq!(save["starterData"]["1"]["abilityAttr"], json!(1));
        assert!(save["starterData"]["4"].get("abilityAttr").is_none());
        assert_eq!(save["starterData"]["7"]["abilityAttr"], json!(4));
    }

    #[test]
    fn unreadable_mask_fails_the_migration() {
        let mut save = json!({ "dexData": { "1": { "caughtAttr": "not a number" } } });
        assert!(migrate_ability_data(&mut save).is_err());
    }

    #[test]
    fn starter_repair_clamps_egg_moves() {
        let mut save = json!({
            "starterData": { "1": { "eggMoves": 31, "classicWinCount": 4 }, "4": { "eggMoves": null } }
        });
        fix_starter_data(&mut save).unwrap();
        assert_eq!(save["starterData"]["1"], json!({ "eggMoves": 15, "classicWinCount": 4 }));
        assert_eq!(save["starterData"]["4"], json!({ "eggMoves": 0, "classicWinCount": 0 }));
    }

    #[test]
    fn stat_backfill_keeps_existing_values() {
        let mut save = json!({ "gameStats": { "mythicalPokemonCaught": 2 } });
        fix_legendary_stats(&mut save).unwrap();
        assert_eq!(save["gameStats"]["mythicalPokemonCaught"], json!(2));
        assert_eq!(save["gameStats"]["legendaryPokemonSeen"], json!(0));
        assert_eq!(save["gameStats"].as_object().unwrap().len(), RARITY_STAT_COUNTERS.len());
    }

    #[test]
    fn pity_counters_pad_but_never_truncate() {
        let mut save = json!({ "eggPity": [1, 2, 3, 4, 5], "unlockPity": null });
        fill_pity_counters(&mut save).unwrap();
        assert_eq!(save["eggPity"], json!([1, 2, 3, 4, 5]));
        assert_eq!(save["unlockPity"], json!([0, 0, 0, 0]));
    }
}
