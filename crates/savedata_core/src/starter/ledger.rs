use super::costs::{self, MAX_EGGS, VALUE_REDUCTION_MAX};
use super::{passive, LedgerError, StarterDataEntry, EGG_MOVE_MASK};
use crate::save::format::{current_timestamp, EggData};
use crate::save::SystemSaveData;
use crate::species::SpeciesCatalog;
use rand::Rng;
use std::collections::BTreeSet;

/// Egg source marker for eggs bought with candy
pub const SAME_SPECIES_EGG_SOURCE: u8 = 3;

/// External adjustment to a starter's point value (challenge rules and the like).
pub trait StarterCostModifier {
    /// Factor applied to the reduced value of `species`.
    fn multiplier(&self, species: u32, base_cost: u8) -> f64;
}

/// Candy-gated starter upgrades against one save.
///
/// Every commit re-checks affordability itself; a check made earlier by the
/// caller is never trusted.
pub struct StarterLedger<'a> {
    save: &'a mut SystemSaveData,
    catalog: &'a SpeciesCatalog,
}

impl<'a> StarterLedger<'a> {
    pub fn new(save: &'a mut SystemSaveData, catalog: &'a SpeciesCatalog) -> Self {
        Self { save, catalog }
    }

    /// Root species and its starter cost.
    fn resolve(&self, species: u32) -> Result<(u32, u8), LedgerError> {
        if !self.catalog.contains(species) {
            return Err(LedgerError::UnknownSpecies(species));
        }
        let root = self.catalog.root_species(species);
        let cost = self.catalog.get(root).and_then(|s| s.cost).ok_or(LedgerError::NotAStarter(root))?;
        Ok((root, cost))
    }

    fn entry_mut(&mut self, root: u32) -> &mut StarterDataEntry {
        self.save.starter_data.entry(root).or_default()
    }

    pub fn entry(&self, species: u32) -> Option<&StarterDataEntry> {
        let (root, _) = self.resolve(species).ok()?;
        self.save.starter_data.get(&root)
    }

    pub fn candy(&self, species: u32) -> u32 {
        self.entry(species).map_or(0, |e| e.candy_count)
    }

    fn root_caught(&self, root: u32) -> bool {
        self.save.dex_data.get(&root).map_or(false, |e| e.is_caught())
    }

    /// Credit candy to the species' starter line.
    ///
    /// Returns `Ok(false)` without touching the balance when the root form has
    /// never been caught.
    pub fn add_candy(&mut self, species: u32, amount: u32) -> Result<bool, LedgerError> {
        let (root, _) = self.resolve(species)?;
        if !self.root_caught(root) {
            log::debug!("Candy for species {} skipped: root {} never caught", species, root);
            return Ok(false);
        }
        let entry = self.entry_mut(root);
        entry.candy_count = entry.candy_count.saturating_add(amount);
        Ok(true)
    }

    /// Add friendship; every full bar turns into one candy.
    ///
    /// Returns the number of candies earned.
    pub fn add_friendship(&mut self, species: u32, amount: u32) -> Result<u32, LedgerError> {
        let (root, cost) = self.resolve(species)?;
        if !self.root_caught(root) {
            return Ok(0);
        }
        let cap = costs::friendship_cap(cost);
        let entry = self.entry_mut(root);
        let total = entry.friendship.saturating_add(amount);
        let candies = total / cap;
        entry.friendship = total % cap;
        entry.candy_count = entry.candy_count.saturating_add(candies);
        Ok(candies)
    }

    pub fn passive_cost(&self, species: u32) -> Result<u32, LedgerError> {
        let (_, cost) = self.resolve(species)?;
        Ok(costs::passive_cost(cost))
    }

    pub fn can_afford_passive(&self, species: u32) -> bool {
        let Ok((root, cost)) = self.resolve(species) else {
            return false;
        };
        self.save.starter_data.get(&root).map_or(false, |e| {
            !e.passive_unlocked() && e.candy_count >= costs::passive_cost(cost)
        })
    }

    /// Unlock and enable the passive, spending its candy cost.
    pub fn commit_passive_unlock(&mut self, species: u32) -> Result<u32, LedgerError> {
        let (root, cost) = self.resolve(species)?;
        let price = costs::passive_cost(cost);
        let entry = self.entry_mut(root);

        if entry.passive_unlocked() {
            return Err(LedgerError::PassiveAlreadyUnlocked { species: root });
        }
        if entry.candy_count < price {
            return Err(reject(root, price, entry.candy_count));
        }
        entry.candy_count -= price;
        entry.passive_attr |= passive::UNLOCKED | passive::ENABLED;
        Ok(price)
    }

    /// Flip the enabled flag of an unlocked passive. Returns the new state.
    pub fn toggle_passive_enabled(&mut self, species: u32) -> Result<bool, LedgerError> {
        let (root, _) = self.resolve(species)?;
        let entry = self.entry_mut(root);
        if !entry.passive_unlocked() {
            return Err(LedgerError::PassiveLocked { species: root });
        }
        entry.passive_attr ^= passive::ENABLED;
        Ok(entry.passive_enabled())
    }

    /// Price of the next reduction step, `None` once at the maximum.
    pub fn cost_reduction_cost(&self, species: u32) -> Result<Option<u32>, LedgerError> {
        let (root, cost) = self.resolve(species)?;
        let level = self.save.starter_data.get(&root).map_or(0, |e| e.value_reduction);
        Ok(costs::value_reduction_cost(cost, level))
    }

    pub fn can_afford_cost_reduction(&self, species: u32) -> bool {
        let Ok((root, cost)) = self.resolve(species) else {
            return false;
        };
        self.save.starter_data.get(&root).map_or(false, |e| {
            e.value_reduction < VALUE_REDUCTION_MAX
                && costs::value_reduction_cost(cost, e.value_reduction)
                    .map_or(false, |price| e.candy_count >= price)
        })
    }

    pub fn commit_cost_reduction(&mut self, species: u32) -> Result<u32, LedgerError> {
        let (root, cost) = self.resolve(species)?;
        let entry = self.entry_mut(root);

        let price = match costs::value_reduction_cost(cost, entry.value_reduction) {
            Some(price) if entry.value_reduction < VALUE_REDUCTION_MAX => price,
            _ => return Err(LedgerError::MaxCostReduction { species: root }),
        };
        if entry.candy_count < price {
            return Err(reject(root, price, entry.candy_count));
        }
        entry.candy_count -= price;
        entry.value_reduction += 1;
        Ok(price)
    }

    pub fn can_afford_same_species_egg(&self, species: u32) -> bool {
        let Ok((root, cost)) = self.resolve(species) else {
            return false;
        };
        self.save.eggs.len() < MAX_EGGS
            && self
                .save
                .starter_data
                .get(&root)
                .map_or(false, |e| e.candy_count >= costs::same_species_egg_cost(cost))
    }

    /// Buy an egg of the species' starter line and queue it.
    pub fn commit_same_species_egg<R: Rng + ?Sized>(
        &mut self,
        species: u32,
        rng: &mut R,
    ) -> Result<EggData, LedgerError> {
        let (root, cost) = self.resolve(species)?;
        if self.save.eggs.len() >= MAX_EGGS {
            return Err(LedgerError::EggCapacity { max: MAX_EGGS });
        }
        let price = costs::same_species_egg_cost(cost);
        let entry = self.entry_mut(root);
        if entry.candy_count < price {
            return Err(reject(root, price, entry.candy_count));
        }
        entry.candy_count -= price;

        let tier = costs::egg_tier(cost);
        let egg = EggData {
            id: rng.gen_range(1..u32::MAX),
            tier,
            source_type: SAME_SPECIES_EGG_SOURCE,
            hatch_waves: costs::EGG_HATCH_WAVES[usize::from(tier)],
            timestamp: current_timestamp(),
            species: root,
            ..Default::default()
        };
        self.save.eggs.push(egg.clone());
        Ok(egg)
    }

    /// Unlock egg move slot `index` (0-3). Returns `false` if it already was.
    pub fn unlock_egg_move(&mut self, species: u32, index: u8) -> Result<bool, LedgerError> {
        if index >= 4 {
            return Err(LedgerError::InvalidEggMove { index });
        }
        let (root, _) = self.resolve(species)?;
        let entry = self.entry_mut(root);
        let bit = 1u8 << index;
        let newly = entry.egg_moves & bit == 0;
        entry.egg_moves = (entry.egg_moves | bit) & EGG_MOVE_MASK;
        Ok(newly)
    }

    /// Count a classic win once per starter line in the party.
    pub fn record_classic_win(&mut self, party: &[u32]) {
        let roots: BTreeSet<u32> = party
            .iter()
            .filter_map(|&species| self.resolve(species).ok().map(|(root, _)| root))
            .collect();
        for root in roots {
            let entry = self.entry_mut(root);
            entry.classic_win_count = entry.classic_win_count.saturating_add(1);
        }
    }

    /// Point value after cost reductions.
    pub fn starter_value(&self, species: u32) -> Result<f64, LedgerError> {
        self.starter_value_with(species, &[])
    }

    /// Point value after cost reductions, then every modifier in turn.
    ///
    /// Each reduction level subtracts one while the value is above 1 and
    /// halves it otherwise, so the value approaches 0.5 but stays positive.
    pub fn starter_value_with(
        &self,
        species: u32,
        modifiers: &[&dyn StarterCostModifier],
    ) -> Result<f64, LedgerError> {
        let (root, cost) = self.resolve(species)?;
        let reduction = self.save.starter_data.get(&root).map_or(0, |e| e.value_reduction);

        let mut value = f64::from(cost);
        for _ in 0..reduction {
            if value > 1.0 {
                value -= 1.0;
            } else {
                value /= 2.0;
            }
        }
        Ok(modifiers.iter().fold(value, |v, m| v * m.multiplier(root, cost)))
    }
}

fn reject(species: u32, cost: u32, balance: u32) -> LedgerError {
    log::warn!("Rejected candy spend for species {}: cost {} > balance {}", species, cost, balance);
    LedgerError::InsufficientCandy { species, cost, balance }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dex::{CatchRecord, DexAttrProps, DexLedger, Nature};
    use crate::starter::abilities;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn save_with_caught(species: &[u32]) -> SystemSaveData {
        let catalog = SpeciesCatalog::builtin();
        let mut save = SystemSaveData::empty(&catalog);
        let mut dex = DexLedger::new(&mut save, &catalog);
        for &id in species {
            dex.set_caught(&CatchRecord {
                species: id,
                props: DexAttrProps::default(),
                nature: Nature::Hardy,
                ivs: [0; 6],
                ability_index: 0,
                hatched: false,
            })
            .unwrap();
        }
        save
    }

    #[test]
    fn candy_requires_caught_root() {
        let catalog = SpeciesCatalog::builtin();
        let mut save = save_with_caught(&[1]);
        let mut ledger = StarterLedger::new(&mut save, &catalog);

        assert!(ledger.add_candy(3, 10).unwrap());
        assert_eq!(ledger.candy(1), 10);

        // Charmander line never caught: a rental does not earn candy
        assert!(!ledger.add_candy(6, 10).unwrap());
        assert_eq!(ledger.candy(4), 0);

        assert!(matches!(ledger.add_candy(9999, 1), Err(LedgerError::UnknownSpecies(9999))));
    }

    #[test]
    fn passive_unlock_spends_exact_cost() {
        let catalog = SpeciesCatalog::builtin();
        let mut save = save_with_caught(&[1]);
        let mut ledger = StarterLedger::new(&mut save, &catalog);

        ledger.add_candy(1, 34).unwrap();
        assert!(!ledger.can_afford_passive(1));
        let err = ledger.commit_passive_unlock(1).unwrap_err();
        assert_eq!(err, LedgerError::InsufficientCandy { species: 1, cost: 35, balance: 34 });
        assert_eq!(ledger.candy(1), 34);

        ledger.add_candy(1, 1).unwrap();
        assert!(ledger.can_afford_passive(1));
        assert_eq!(ledger.commit_passive_unlock(1).unwrap(), 35);
        assert_eq!(ledger.candy(1), 0);

        let entry = ledger.entry(1).unwrap();
        assert!(entry.passive_unlocked() && entry.passive_enabled());

        ledger.add_candy(1, 100).unwrap();
        assert!(!ledger.can_afford_passive(1));
        assert!(matches!(
            ledger.commit_passive_unlock(1),
            Err(LedgerError::PassiveAlreadyUnlocked { .. })
        ));
        assert!(!ledger.toggle_passive_enabled(1).unwrap());
        assert!(ledger.toggle_passive_enabled(1).unwrap());
    }

    #[test]
    fn cost_reduction_caps_at_max() {
        let catalog = SpeciesCatalog::builtin();
        let mut save = save_with_caught(&[1]);
        let mut ledger = StarterLedger::new(&mut save, &catalog);
        ledger.add_candy(1, 200).unwrap();

        assert_eq!(ledger.commit_cost_reduction(1).unwrap(), 20);
        assert_eq!(ledger.commit_cost_reduction(1).unwrap(), 50);
        assert!(!ledger.can_afford_cost_reduction(1));
        assert!(matches!(
            ledger.commit_cost_reduction(1),
            Err(LedgerError::MaxCostReduction { species: 1 })
        ));
        assert_eq!(ledger.candy(1), 130);
        assert_eq!(ledger.cost_reduction_cost(1).unwrap(), None);
    }

    #[test]
    fn starter_value_halves_below_one() {
        let catalog = SpeciesCatalog::builtin();
        let mut save = save_with_caught(&[16, 1]);
        save.starter_data.get_mut(&16).unwrap().value_reduction = 2;
        save.starter_data.get_mut(&1).unwrap().value_reduction = 2;
        let ledger = StarterLedger::new(&mut save, &catalog);

        // Pidgey: 1 -> 0.5 -> 0.25
        assert_eq!(ledger.starter_value(16).unwrap(), 0.25);
        // Bulbasaur: 3 -> 2 -> 1
        assert_eq!(ledger.starter_value(1).unwrap(), 1.0);
    }

    struct Double;

    impl StarterCostModifier for Double {
        fn multiplier(&self, _species: u32, _base_cost: u8) -> f64 {
            2.0
        }
    }

    #[test]
    fn modifiers_apply_multiplicatively() {
        let catalog = SpeciesCatalog::builtin();
        let mut save = save_with_caught(&[4]);
        let ledger = StarterLedger::new(&mut save, &catalog);
        let value = ledger.starter_value_with(4, &[&Double, &Double]).unwrap();
        assert_eq!(value, 12.0);
    }

    #[test]
    fn same_species_egg_is_queued() {
        let catalog = SpeciesCatalog::builtin();
        let mut save = save_with_caught(&[150]);
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let mut ledger = StarterLedger::new(&mut save, &catalog);

        assert!(!ledger.can_afford_same_species_egg(150));
        ledger.add_candy(150, 10).unwrap();
        let egg = ledger.commit_same_species_egg(150, &mut rng).unwrap();
        assert_eq!(egg.species, 150);
        assert_eq!(egg.tier, 3);
        assert_eq!(egg.hatch_waves, 100);
        assert_eq!(ledger.candy(150), 0);
        assert_eq!(save.eggs.len(), 1);
    }

    #[test]
    fn egg_capacity_is_enforced() {
        let catalog = SpeciesCatalog::builtin();
        let mut save = save_with_caught(&[16]);
        save.eggs = vec![EggData::default(); MAX_EGGS];
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut ledger = StarterLedger::new(&mut save, &catalog);
        ledger.add_candy(16, 100).unwrap();

        assert!(!ledger.can_afford_same_species_egg(16));
        assert!(matches!(
            ledger.commit_same_species_egg(16, &mut rng),
            Err(LedgerError::EggCapacity { max: MAX_EGGS })
        ));
        assert_eq!(ledger.candy(16), 100);
    }

    #[test]
    fn friendship_converts_to_candy() {
        let catalog = SpeciesCatalog::builtin();
        let mut save = save_with_caught(&[16]);
        let mut ledger = StarterLedger::new(&mut save, &catalog);

        // Pidgey cap is 20
        assert_eq!(ledger.add_friendship(16, 45).unwrap(), 2);
        assert_eq!(ledger.entry(16).unwrap().friendship, 5);
        assert_eq!(ledger.candy(16), 2);
        assert_eq!(ledger.add_friendship(19, 45).unwrap(), 0);
    }

    #[test]
    fn egg_moves_and_wins() {
        let catalog = SpeciesCatalog::builtin();
        let mut save = save_with_caught(&[1, 4]);
        let mut ledger = StarterLedger::new(&mut save, &catalog);

        assert!(ledger.unlock_egg_move(2, 3).unwrap());
        assert!(!ledger.unlock_egg_move(1, 3).unwrap());
        assert!(matches!(ledger.unlock_egg_move(1, 4), Err(LedgerError::InvalidEggMove { index: 4 })));

        ledger.record_classic_win(&[1, 2, 6, 9999]);
        assert_eq!(ledger.entry(1).unwrap().classic_win_count, 1);
        assert_eq!(ledger.entry(4).unwrap().classic_win_count, 1);
        assert_eq!(ledger.entry(1).unwrap().egg_moves, 0b1000);
        assert_eq!(ledger.entry(1).unwrap().ability_attr, abilities::ABILITY_1);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            Add(u32),
            Passive,
            Reduce,
        }

        fn op() -> impl Strategy<Value = Op> {
            prop_oneof![(0u32..80).prop_map(Op::Add), Just(Op::Passive), Just(Op::Reduce)]
        }

        proptest! {
            /// Property: a rejected spend leaves the balance untouched, an accepted one
            /// subtracts exactly its price
            #[test]
            fn prop_candy_never_negative(ops in prop::collection::vec(op(), 0..40)) {
                let catalog = SpeciesCatalog::builtin();
                let mut save = save_with_caught(&[1]);
                let mut ledger = StarterLedger::new(&mut save, &catalog);

                for op in ops {
                    let before = ledger.candy(1);
                    match op {
                        Op::Add(n) => {
                            ledger.add_candy(1, n).unwrap();
                            prop_assert_eq!(ledger.candy(1), before + n);
                        }
                        Op::Passive => match ledger.commit_passive_unlock(1) {
                            Ok(price) => prop_assert_eq!(ledger.candy(1), before - price),
                            Err(_) => prop_assert_eq!(ledger.candy(1), before),
                        },
                        Op::Reduce => match ledger.commit_cost_reduction(1) {
                            Ok(price) => prop_assert_eq!(ledger.candy(1), before - price),
                            Err(_) => prop_assert_eq!(ledger.candy(1), before),
                        },
                    }
                    prop_assert!(ledger.entry(1).unwrap().value_reduction <= VALUE_REDUCTION_MAX);
                }
            }
        }
    }
}
