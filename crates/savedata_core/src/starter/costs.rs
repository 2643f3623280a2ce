//! Candy price tables, indexed by starter cost 1-10.

/// Highest `valueReduction` level
pub const VALUE_REDUCTION_MAX: u8 = 2;

/// Pending egg limit
pub const MAX_EGGS: usize = 99;

const PASSIVE_COSTS: [u32; 10] = [40, 40, 35, 30, 25, 20, 15, 10, 10, 10];

const VALUE_REDUCTION_COSTS: [[u32; VALUE_REDUCTION_MAX as usize]; 10] = [
    [25, 60],
    [25, 60],
    [20, 50],
    [15, 40],
    [12, 35],
    [10, 30],
    [8, 20],
    [5, 15],
    [5, 15],
    [5, 15],
];

const SAME_SPECIES_EGG_COSTS: [u32; 10] = [30, 30, 25, 20, 18, 15, 12, 10, 10, 10];

/// Friendship needed for one candy
const FRIENDSHIP_CAPS: [u32; 10] = [20, 40, 60, 100, 140, 200, 280, 450, 450, 600];

/// Egg hatch waves per tier (common, rare, epic, legendary)
pub const EGG_HATCH_WAVES: [u32; 4] = [10, 25, 50, 100];

fn index(cost: u8) -> usize {
    usize::from(cost.clamp(1, 10)) - 1
}

pub fn passive_cost(cost: u8) -> u32 {
    PASSIVE_COSTS[index(cost)]
}

/// Price of the next reduction step, `None` once fully reduced.
pub fn value_reduction_cost(cost: u8, current_level: u8) -> Option<u32> {
    VALUE_REDUCTION_COSTS[index(cost)].get(usize::from(current_level)).copied()
}

pub fn same_species_egg_cost(cost: u8) -> u32 {
    SAME_SPECIES_EGG_COSTS[index(cost)]
}

pub fn friendship_cap(cost: u8) -> u32 {
    FRIENDSHIP_CAPS[index(cost)]
}

/// Egg tier a starter of this cost hatches from.
pub fn egg_tier(cost: u8) -> u8 {
    match cost {
        0..=3 => 0,
        4..=5 => 1,
        6..=7 => 2,
        _ => 3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_cover_every_cost() {
        assert_eq!(passive_cost(1), 40);
        assert_eq!(passive_cost(5), 25);
        assert_eq!(passive_cost(10), 10);
        assert_eq!(same_species_egg_cost(4), 20);
        assert_eq!(friendship_cap(7), 280);
    }

    #[test]
    fn out_of_range_costs_clamp() {
        assert_eq!(passive_cost(0), passive_cost(1));
        assert_eq!(passive_cost(200), passive_cost(10));
    }

    #[test]
    fn reduction_steps_stop_at_max() {
        assert_eq!(value_reduction_cost(3, 0), Some(20));
        assert_eq!(value_reduction_cost(3, 1), Some(50));
        assert_eq!(value_reduction_cost(3, VALUE_REDUCTION_MAX), None);
    }

    #[test]
    fn egg_tiers_follow_cost_bands() {
        assert_eq!(egg_tier(1), 0);
        assert_eq!(egg_tier(5), 1);
        assert_eq!(egg_tier(7), 2);
        assert_eq!(egg_tier(8), 3);
    }
}
