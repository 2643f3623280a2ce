//! Portable backup files.
//!
//! A portable file is the base64 text of a cipher envelope sealed under the
//! export secret. System saves use the short field aliases from
//! [`crate::save::rename`]; every other category is exported verbatim. The
//! file does not record its category, the importer supplies it.

use super::cipher::Cipher;
use super::encrypted::EncryptedStore;
use super::KvStore;
use crate::save::migration::migrate_blob;
use crate::save::rename::{lengthen_keys, shorten_keys};
use crate::save::{SaveCategory, SaveError, StorageKey};
use base64::{engine::general_purpose, Engine as _};
use serde_json::Value;

/// Export the blob stored under `key`, or `None` when nothing is stored.
pub fn export_portable<S: KvStore>(
    store: &EncryptedStore<S>,
    key: &StorageKey,
    export_secret: &str,
) -> Result<Option<String>, SaveError> {
    let Some(json) = store.get_string(key)? else {
        return Ok(None);
    };
    let value: Value = serde_json::from_str(&json)?;
    encode_portable(key.category, value, export_secret).map(Some)
}

/// Encode an in-memory blob as a portable file.
pub fn encode_portable(category: SaveCategory, mut value: Value, export_secret: &str) -> Result<String, SaveError> {
    if category.uses_short_keys() {
        shorten_keys(&mut value);
    }
    let plaintext = serde_json::to_vec(&value)?;
    let sealed = Cipher::new(export_secret).seal(&plaintext, false)?;
    Ok(general_purpose::STANDARD.encode(sealed))
}

/// Decode without migrating or validating, for inspection.
pub fn decode_portable(blob: &str, category: SaveCategory, export_secret: &str) -> Result<Value, SaveError> {
    let sealed = general_purpose::STANDARD
        .decode(blob.trim())
        .map_err(|e| SaveError::Decryption { reason: format!("not a portable save file: {e}") })?;
    let plaintext = Cipher::new(export_secret).open(&sealed)?;
    let mut value: Value = serde_json::from_slice(&plaintext)?;
    if category.uses_short_keys() {
        lengthen_keys(&mut value);
    }
    Ok(value)
}

/// Decode, migrate and structurally check a portable file.
///
/// Nothing is written anywhere; the caller persists the returned blob.
pub fn import_portable(blob: &str, category: SaveCategory, export_secret: &str) -> Result<Value, SaveError> {
    let value = decode_portable(blob, category, export_secret)?;
    let value = migrate_blob(category, value)?;
    validate(category, &value)?;
    Ok(value)
}

/// Category-specific shape check run before an import is accepted.
pub fn validate(category: SaveCategory, value: &Value) -> Result<(), SaveError> {
    let Some(obj) = value.as_object() else {
        return Err(SaveError::validation(category, "expected a JSON object"));
    };

    match category {
        SaveCategory::System => {
            let has_dex = obj.get("dexData").and_then(Value::as_object).is_some_and(|d| !d.is_empty());
            if !has_dex {
                return Err(SaveError::validation(category, "missing dex data"));
            }
            require_timestamp(category, value)
        }
        SaveCategory::Session => {
            for field in ["party", "enemyParty"] {
                let present = obj.get(field).and_then(Value::as_array).is_some_and(|p| !p.is_empty());
                if !present {
                    return Err(SaveError::validation(category, format!("missing {field}")));
                }
            }
            require_timestamp(category, value)
        }
        SaveCategory::RunHistory => {
            for (key, run) in obj {
                let complete = run.get("entry").is_some_and(Value::is_object)
                    && run.get("isVictory").is_some_and(Value::is_boolean);
                if !complete {
                    return Err(SaveError::validation(category, format!("run {key} is incomplete")));
                }
            }
            Ok(())
        }
        SaveCategory::Settings | SaveCategory::Tutorials | SaveCategory::SeenDialogues => {
            match FOREIGN_SAVE_KEYS.iter().find(|k| obj.contains_key(**k)) {
                Some(key) => Err(SaveError::validation(category, format!("unexpected {key}, not a {category} blob"))),
                None => Ok(()),
            }
        }
    }
}

/// Keys only a system or session save carries.
const FOREIGN_SAVE_KEYS: [&str; 4] = ["dexData", "trainerId", "party", "enemyParty"];

fn require_timestamp(category: SaveCategory, value: &Value) -> Result<(), SaveError> {
    match value.get("timestamp").and_then(Value::as_u64) {
        Some(ts) if ts > 0 => Ok(()),
        _ => Err(SaveError::validation(category, "missing timestamp")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SaveConfig;
    use crate::species::SpeciesCatalog;
    use crate::store::MemoryStore;
    use crate::{SessionSaveData, SystemSaveData};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use serde_json::json;

    const SECRET: &str = "export-secret";

    fn stored_system() -> (EncryptedStore<MemoryStore>, SystemSaveData) {
        let catalog = SpeciesCatalog::builtin();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let save = SystemSaveData::fresh(&catalog, &mut rng);
        let mut store = EncryptedStore::new(MemoryStore::new(), &SaveConfig::default());
        store.put_string(&StorageKey::system("ash"), &save.to_json().unwrap()).unwrap();
        (store, save)
    }

    #[test]
    fn system_export_import_roundtrip() {
        let (store, save) = stored_system();
        let blob = export_portable(&store, &StorageKey::system("ash"), SECRET).unwrap().unwrap();

        let value = import_portable(&blob, SaveCategory::System, SECRET).unwrap();
        let imported: SystemSaveData = serde_json::from_value(value).unwrap();
        assert_eq!(imported, save);
    }

    #[test]
    fn system_payload_uses_short_aliases() {
        let (store, _) = stored_system();
        let blob = export_portable(&store, &StorageKey::system("ash"), SECRET).unwrap().unwrap();

        let sealed = general_purpose::STANDARD.decode(&blob).unwrap();
        let plaintext = Cipher::new(SECRET).open(&sealed).unwrap();
        let raw: Value = serde_json::from_slice(&plaintext).unwrap();
        assert!(raw["dexData"]["1"].get("$ca").is_some());
        assert!(raw["dexData"]["1"].get("caughtAttr").is_none());
    }

    #[test]
    fn nothing_stored_exports_none() {
        let store = EncryptedStore::new(MemoryStore::new(), &SaveConfig::default());
        assert_eq!(export_portable(&store, &StorageKey::system("ash"), SECRET).unwrap(), None);
    }

    #[test]
    fn wrong_secret_is_decryption_failure() {
        let (store, _) = stored_system();
        let blob = export_portable(&store, &StorageKey::system("ash"), SECRET).unwrap().unwrap();

        let err = import_portable(&blob, SaveCategory::System, "other-secret").unwrap_err();
        assert!(matches!(err, SaveError::Decryption { .. }));
        assert!(matches!(
            import_portable("%%% not base64", SaveCategory::System, SECRET),
            Err(SaveError::Decryption { .. })
        ));
    }

    #[test]
    fn wrong_category_is_rejected() {
        let (store, _) = stored_system();
        let blob = export_portable(&store, &StorageKey::system("ash"), SECRET).unwrap().unwrap();

        let err = import_portable(&blob, SaveCategory::Session, SECRET).unwrap_err();
        assert!(matches!(err, SaveError::Validation { category: SaveCategory::Session, .. }));
    }

    #[test]
    fn settings_import_rejects_other_save_shapes() {
        let (store, _) = stored_system();
        let system = export_portable(&store, &StorageKey::system("ash"), SECRET).unwrap().unwrap();
        let err = import_portable(&system, SaveCategory::Settings, SECRET).unwrap_err();
        assert!(matches!(err, SaveError::Validation { category: SaveCategory::Settings, .. }));

        let session = json!({ "party": [{ "species": 1 }], "enemyParty": [], "timestamp": 5 });
        let blob = encode_portable(SaveCategory::Tutorials, session, SECRET).unwrap();
        assert!(import_portable(&blob, SaveCategory::Tutorials, SECRET).is_err());

        let dialogues = encode_portable(SaveCategory::SeenDialogues, json!({ "intro": true }), SECRET).unwrap();
        assert!(import_portable(&dialogues, SaveCategory::SeenDialogues, SECRET).is_ok());
    }

    #[test]
    fn session_requires_both_parties() {
        let session = SessionSaveData {
            timestamp: 1_700_000_000_000,
            game_version: crate::CURRENT_GAME_VERSION.to_string(),
            party: vec![Default::default()],
            ..Default::default()
        };
        let value = serde_json::to_value(&session).unwrap();
        let blob = encode_portable(SaveCategory::Session, value, SECRET).unwrap();

        let err = import_portable(&blob, SaveCategory::Session, SECRET).unwrap_err();
        assert!(err.to_string().contains("enemyParty"));
    }

    #[test]
    fn settings_are_exported_verbatim() {
        let settings = json!({ "gameSpeed": 3, "SHOP_CURSOR_TARGET": 1, "gameVersion": crate::CURRENT_GAME_VERSION });
        let blob = encode_portable(SaveCategory::Settings, settings.clone(), SECRET).unwrap();
        assert_eq!(import_portable(&blob, SaveCategory::Settings, SECRET).unwrap(), settings);
    }
}
