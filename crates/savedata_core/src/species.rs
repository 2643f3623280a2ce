//! Species catalog consulted by the dex and starter ledgers.
//!
//! The built-in catalog is embedded at compile time and parsed once.

use crate::save::SaveError;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Built-in catalog JSON
pub const SPECIES_JSON: &str = include_str!("../../../data/species.json");

static BUILTIN: Lazy<Arc<SpeciesCatalog>> = Lazy::new(|| {
    let catalog = SpeciesCatalog::from_json(SPECIES_JSON).unwrap_or_else(|e| {
        log::error!("Embedded species catalog is invalid: {}", e);
        SpeciesCatalog::default()
    });
    Arc::new(catalog)
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Rarity {
    SubLegendary,
    Legendary,
    Mythical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeciesInfo {
    pub id: u32,
    pub name: String,
    /// Starter cost, present only on starter-eligible root species
    #[serde(default)]
    pub cost: Option<u8>,
    #[serde(default)]
    pub prevolution: Option<u32>,
    #[serde(default = "default_form_count")]
    pub form_count: u32,
    #[serde(default = "default_true")]
    pub has_gender: bool,
    #[serde(default)]
    pub rarity: Option<Rarity>,
}

fn default_form_count() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogFile {
    #[serde(default)]
    default_starters: Vec<u32>,
    species: Vec<SpeciesInfo>,
}

#[derive(Debug, Clone, Default)]
pub struct SpeciesCatalog {
    species: BTreeMap<u32, SpeciesInfo>,
    default_starters: Vec<u32>,
}

impl SpeciesCatalog {
    pub fn builtin() -> Arc<SpeciesCatalog> {
        Arc::clone(&BUILTIN)
    }

    pub fn from_json(json: &str) -> Result<Self, SaveError> {
        let file: CatalogFile = serde_json::from_str(json)?;
        Self::from_species(file.species, file.default_starters)
    }

    pub fn from_species(list: Vec<SpeciesInfo>, default_starters: Vec<u32>) -> Result<Self, SaveError> {
        let mut species = BTreeMap::new();
        for info in list {
            if info.form_count == 0 {
                return Err(SaveError::Config(format!("species {} has zero forms", info.id)));
            }
            let id = info.id;
            if species.insert(id, info).is_some() {
                return Err(SaveError::Config(format!("duplicate species id {id}")));
            }
        }

        let catalog = Self { species, default_starters };
        for &id in &catalog.default_starters {
            if !catalog.is_starter(id) {
                return Err(SaveError::Config(format!("default starter {id} is not a starter")));
            }
        }
        Ok(catalog)
    }

    pub fn get(&self, id: u32) -> Option<&SpeciesInfo> {
        self.species.get(&id)
    }

    pub fn contains(&self, id: u32) -> bool {
        self.species.contains_key(&id)
    }

    pub fn species_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.species.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.species.len()
    }

    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }

    /// Walk the prevolution chain down to the first stage.
    ///
    /// Unknown ids are their own root. The walk stops after one pass over the
    /// catalog so a malformed cycle cannot loop forever.
    pub fn root_species(&self, id: u32) -> u32 {
        let mut current = id;
        for _ in 0..=self.species.len() {
            match self.species.get(&current).and_then(|s| s.prevolution) {
                Some(prev) if self.species.contains_key(&prev) => current = prev,
                _ => break,
            }
        }
        current
    }

    /// Every species from `id` down to its root, inclusive.
    pub fn prevolution_chain(&self, id: u32) -> Vec<u32> {
        let mut chain = vec![id];
        let mut current = id;
        while let Some(prev) = self.species.get(&current).and_then(|s| s.prevolution) {
            if chain.contains(&prev) || !self.species.contains_key(&prev) {
                break;
            }
            chain.push(prev);
            current = prev;
        }
        chain
    }

    pub fn is_starter(&self, id: u32) -> bool {
        self.species.get(&id).map_or(false, |s| s.cost.is_some())
    }

    pub fn starter_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.species.values().filter(|s| s.cost.is_some()).map(|s| s.id)
    }

    /// Cost of the starter line `id` belongs to.
    pub fn starter_cost(&self, id: u32) -> Option<u8> {
        self.species.get(&self.root_species(id)).and_then(|s| s.cost)
    }

    pub fn default_starters(&self) -> &[u32] {
        &self.default_starters
    }

    pub fn rarity(&self, id: u32) -> Option<Rarity> {
        self.species.get(&id).and_then(|s| s.rarity)
    }
}
