use num_bigint::BigUint;
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Per-species dex record.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct DexEntry {
    #[serde(with = "crate::save::bigmask")]
    pub seen_attr: BigUint,

    #[serde(with = "crate::save::bigmask")]
    pub caught_attr: BigUint,

    /// Bit `n + 1` set means nature `n` unlocked
    pub nature_attr: u32,

    pub seen_count: u32,
    pub caught_count: u32,
    pub hatched_count: u32,

    /// Best IV seen per stat, each 0-31
    pub ivs: [u8; 6],

    /// Opaque ribbon record, carried through untouched
    #[serde(skip_serializing_if = "Value::is_null")]
    pub ribbons: Value,
}

impl DexEntry {
    pub fn is_seen(&self) -> bool {
        !self.seen_attr.is_zero()
    }

    pub fn is_caught(&self) -> bool {
        !self.caught_attr.is_zero()
    }

    /// Caught at least once but no nature recorded.
    pub fn needs_nature_repair(&self) -> bool {
        self.is_caught() && self.nature_attr == 0
    }
}
