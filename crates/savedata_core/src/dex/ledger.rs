use super::attr::{self, DexAttrProps};
use super::entry::DexEntry;
use super::nature::{random_nature_bit, Nature};
use crate::save::SystemSaveData;
use crate::species::{Rarity, SpeciesCatalog};
use crate::starter::{abilities, LedgerError, StarterDataEntry};
use num_bigint::BigUint;
use rand::Rng;

/// One catch or hatch event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CatchRecord {
    pub species: u32,
    pub props: DexAttrProps,
    pub nature: Nature,
    pub ivs: [u8; 6],
    /// 0, 1 or 2 (hidden)
    pub ability_index: u8,
    pub hatched: bool,
}

/// Dex mutations against one save.
pub struct DexLedger<'a> {
    save: &'a mut SystemSaveData,
    catalog: &'a SpeciesCatalog,
}

impl<'a> DexLedger<'a> {
    pub fn new(save: &'a mut SystemSaveData, catalog: &'a SpeciesCatalog) -> Self {
        Self { save, catalog }
    }

    pub fn entry(&self, species: u32) -> Option<&DexEntry> {
        self.save.dex_data.get(&species)
    }

    pub fn is_caught(&self, species: u32) -> bool {
        self.entry(species).map_or(false, DexEntry::is_caught)
    }

    pub fn set_seen(&mut self, species: u32, props: &DexAttrProps) -> Result<(), LedgerError> {
        if !self.catalog.contains(species) {
            return Err(LedgerError::UnknownSpecies(species));
        }

        let entry = self.save.dex_data.entry(species).or_default();
        entry.seen_attr |= attr::encode_props(props);
        entry.seen_count = entry.seen_count.saturating_add(1);

        let stats = &mut self.save.game_stats;
        bump(&mut stats.pokemon_seen);
        if props.shiny {
            bump(&mut stats.shiny_pokemon_seen);
        }
        match self.catalog.rarity(species) {
            Some(Rarity::SubLegendary) => bump(&mut stats.sub_legendary_pokemon_seen),
            Some(Rarity::Legendary) => bump(&mut stats.legendary_pokemon_seen),
            Some(Rarity::Mythical) => bump(&mut stats.mythical_pokemon_seen),
            None => {}
        }
        Ok(())
    }

    /// Record a catch or hatch.
    ///
    /// Caught bits, nature and IV maxima propagate down the prevolution chain
    /// so the root starter unlocks. Returns `true` when this event unlocked
    /// the root as a starter for the first time.
    pub fn set_caught(&mut self, record: &CatchRecord) -> Result<bool, LedgerError> {
        let species = record.species;
        if !self.catalog.contains(species) {
            return Err(LedgerError::UnknownSpecies(species));
        }

        let root = self.catalog.root_species(species);
        let newly_unlocked = self.catalog.is_starter(root) && !self.is_caught(root);
        let nature_bit = record.nature.bit();

        for id in self.catalog.prevolution_chain(species) {
            let form_count = self.catalog.get(id).map_or(1, |s| s.form_count);
            let props = if record.props.form_index < form_count {
                record.props
            } else {
                DexAttrProps { form_index: 0, ..record.props }
            };

            let entry = self.save.dex_data.entry(id).or_default();
            entry.caught_attr |= attr::encode_props(&props);
            entry.nature_attr |= nature_bit;
            for (best, iv) in entry.ivs.iter_mut().zip(record.ivs) {
                *best = (*best).max(iv.min(31));
            }
        }

        let entry = self.save.dex_data.entry(species).or_default();
        let stats = &mut self.save.game_stats;
        if record.hatched {
            entry.hatched_count = entry.hatched_count.saturating_add(1);
            bump(&mut stats.pokemon_hatched);
        } else {
            entry.caught_count = entry.caught_count.saturating_add(1);
            bump(&mut stats.pokemon_caught);
        }
        if record.props.shiny {
            if record.hatched {
                bump(&mut stats.shiny_pokemon_hatched);
            } else {
                bump(&mut stats.shiny_pokemon_caught);
            }
        }
        match (self.catalog.rarity(species), record.hatched) {
            (Some(Rarity::SubLegendary), false) => bump(&mut stats.sub_legendary_pokemon_caught),
            (Some(Rarity::SubLegendary), true) => bump(&mut stats.sub_legendary_pokemon_hatched),
            (Some(Rarity::Legendary), false) => bump(&mut stats.legendary_pokemon_caught),
            (Some(Rarity::Legendary), true) => bump(&mut stats.legendary_pokemon_hatched),
            (Some(Rarity::Mythical), false) => bump(&mut stats.mythical_pokemon_caught),
            (Some(Rarity::Mythical), true) => bump(&mut stats.mythical_pokemon_hatched),
            (None, _) => {}
        }

        if self.catalog.is_starter(root) {
            let starter = self.save.starter_data.entry(root).or_default();
            match abilities::from_index(record.ability_index) {
                Some(bit) => starter.ability_attr |= bit,
                None => log::warn!(
                    "Ignoring ability index {} for species {}",
                    record.ability_index,
                    species
                ),
            }
        }

        if newly_unlocked {
            log::info!("Species {} unlocked as a starter", root);
        }
        Ok(newly_unlocked)
    }

    /// Display combination for a species, `None` if never caught.
    pub fn default_props(&self, species: u32, optimistic: bool) -> Option<DexAttrProps> {
        let entry = self.entry(species).filter(|e| e.is_caught())?;
        let mask = attr::default_attrs_for_props(&entry.caught_attr, optimistic);
        Some(attr::decode_props(&mask))
    }

    pub fn luck(&self, species: u32) -> u8 {
        self.entry(species).map_or(0, |e| attr::luck(&e.caught_attr))
    }
}

fn bump(counter: &mut u32) {
    *counter = counter.saturating_add(1);
}

/// Insert an all-zero entry for every catalog species missing one.
pub fn fill_missing_entries(save: &mut SystemSaveData, catalog: &SpeciesCatalog) {
    for id in catalog.species_ids() {
        save.dex_data.entry(id).or_default();
    }
}

/// Fill gaps and give every caught entry at least one nature.
pub fn consolidate<R: Rng + ?Sized>(save: &mut SystemSaveData, catalog: &SpeciesCatalog, rng: &mut R) {
    fill_missing_entries(save, catalog);

    let mut repaired = 0;
    for entry in save.dex_data.values_mut() {
        if entry.needs_nature_repair() {
            entry.nature_attr = random_nature_bit(rng);
            repaired += 1;
        }
    }
    if repaired > 0 {
        log::debug!("Assigned a random nature to {} caught dex entries", repaired);
    }
}

/// Unlock the new-account starters: both genders, default shiny tier and form.
pub fn unlock_default_starters<R: Rng + ?Sized>(
    save: &mut SystemSaveData,
    catalog: &SpeciesCatalog,
    rng: &mut R,
) {
    let default_attr = BigUint::from(
        attr::NON_SHINY | attr::MALE | attr::FEMALE | attr::DEFAULT_VARIANT | attr::DEFAULT_FORM,
    );

    for &id in catalog.default_starters() {
        let entry = save.dex_data.entry(id).or_default();
        entry.seen_attr = default_attr.clone();
        entry.caught_attr = default_attr.clone();
        entry.nature_attr = random_nature_bit(rng);

        let starter: &mut StarterDataEntry = save.starter_data.entry(id).or_default();
        starter.ability_attr |= abilities::ABILITY_1;
    }
}
