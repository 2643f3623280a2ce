use super::Migrator;
use crate::save::version::GameVersion;
use serde_json::Value;

pub(super) fn migrators() -> Vec<Migrator> {
    vec![Migrator::new(
        GameVersion::new(1, 0, 4),
        "rename_reroll_target",
        "Rename the shop cursor setting",
        rename_reroll_target,
    )]
}

fn rename_reroll_target(value: &mut Value) -> Result<(), String> {
    let settings = value.as_object_mut().ok_or("settings blob is not an object")?;
    if let Some(old) = settings.remove("REROLL_TARGET") {
        if !settings.contains_key("SHOP_CURSOR_TARGET") {
            settings.insert("SHOP_CURSOR_TARGET".into(), old);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn old_key_moves_when_new_is_absent() {
        let mut settings = json!({ "REROLL_TARGET": 2 });
        rename_reroll_target(&mut settings).unwrap();
        assert_eq!(settings, json!({ "SHOP_CURSOR_TARGET": 2 }));
    }

    #[test]
    fn existing_new_key_wins() {
        let mut settings = json!({ "REROLL_TARGET": 2, "SHOP_CURSOR_TARGET": 0 });
        rename_reroll_target(&mut settings).unwrap();
        assert_eq!(settings, json!({ "SHOP_CURSOR_TARGET": 0 }));
    }
}
