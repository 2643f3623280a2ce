//! Short field aliases used by portable system-save exports.
//!
//! Renaming walks the parsed tree and only touches object keys of the
//! per-species records under `dexData` and `starterData`, so string values
//! and unrelated fields are never rewritten.

use serde_json::{Map, Value};

const SECTIONS: [&str; 2] = ["dexData", "starterData"];

/// Full field name -> short alias
pub const SHORT_KEYS: [(&str, &str); 15] = [
    ("seenAttr", "$sa"),
    ("caughtAttr", "$ca"),
    ("natureAttr", "$na"),
    ("seenCount", "$s"),
    ("caughtCount", "$c"),
    ("hatchedCount", "$hc"),
    ("ivs", "$i"),
    ("moveset", "$m"),
    ("eggMoves", "$em"),
    ("candyCount", "$x"),
    ("friendship", "$f"),
    ("abilityAttr", "$a"),
    ("passiveAttr", "$pa"),
    ("valueReduction", "$vr"),
    ("classicWinCount", "$wc"),
];

/// Aliases written by older exporters, mapped onto the current alias
const LEGACY_ALIASES: [(&str, &str); 1] = [("$pAttr", "$pa")];

fn shorten(key: &str) -> Option<&'static str> {
    if let Some((_, current)) = LEGACY_ALIASES.iter().find(|(old, _)| *old == key) {
        return Some(current);
    }
    SHORT_KEYS.iter().find(|(long, _)| *long == key).map(|(_, short)| *short)
}

fn lengthen(key: &str) -> Option<&'static str> {
    let key = LEGACY_ALIASES.iter().find(|(old, _)| *old == key).map_or(key, |(_, new)| *new);
    SHORT_KEYS.iter().find(|(_, short)| *short == key).map(|(long, _)| *long)
}

fn rename_records(value: &mut Value, rename: fn(&str) -> Option<&'static str>) {
    for section in SECTIONS {
        let Some(records) = value.get_mut(section).and_then(Value::as_object_mut) else {
            continue;
        };
        for record in records.values_mut() {
            if let Value::Object(fields) = record {
                let renamed: Map<String, Value> = std::mem::take(fields)
                    .into_iter()
                    .map(|(k, v)| (rename(&k).map_or(k, str::to_string), v))
                    .collect();
                *fields = renamed;
            }
        }
    }
}

/// Replace verbose field names with their aliases.
pub fn shorten_keys(value: &mut Value) {
    rename_records(value, shorten);
}

/// Restore verbose field names, accepting legacy aliases.
pub fn lengthen_keys(value: &mut Value) {
    rename_records(value, lengthen);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn shortens_only_species_records() {
        let mut save = json!({
            "dexData": { "1": { "seenAttr": 1, "caughtAttr": "2", "natureAttr": 4 } },
            "starterData": { "1": { "candyCount": 5, "moveset": ["caughtAttr"] } },
            "gameStats": { "seenCount": 9 },
            "trainerId": 3
        });
        shorten_keys(&mut save);

        assert_eq!(save["dexData"]["1"], json!({ "$sa": 1, "$ca": "2", "$na": 4 }));
        assert_eq!(save["starterData"]["1"], json!({ "$x": 5, "$m": ["caughtAttr"] }));
        assert_eq!(save["gameStats"], json!({ "seenCount": 9 }));
    }

    #[test]
    fn lengthen_reverses_shorten() {
        let original = json!({
            "dexData": { "25": { "seenAttr": 1, "ivs": [1, 2, 3, 4, 5, 6], "ribbons": null } },
            "starterData": { "25": { "passiveAttr": 3, "classicWinCount": 1 } }
        });
        let mut value = original.clone();
        shorten_keys(&mut value);
        assert_ne!(value, original);
        lengthen_keys(&mut value);
        assert_eq!(value, original);
    }

    #[test]
    fn legacy_passive_alias_is_accepted() {
        let mut value = json!({ "starterData": { "4": { "$pAttr": 1, "$x": 2 } } });
        lengthen_keys(&mut value);
        assert_eq!(value["starterData"]["4"], json!({ "passiveAttr": 1, "candyCount": 2 }));
    }

    #[test]
    fn legacy_alias_is_rewritten_on_shorten() {
        let mut value = json!({ "starterData": { "4": { "$pAttr": 1, "candyCount": 2 } } });
        shorten_keys(&mut value);
        assert_eq!(value["starterData"]["4"], json!({ "$pa": 1, "$x": 2 }));
    }
}
