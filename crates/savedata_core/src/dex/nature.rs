use rand::Rng;
use serde::{Deserialize, Serialize};

/// The 25 natures, in id order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Nature {
    Hardy,
    Lonely,
    Brave,
    Adamant,
    Naughty,
    Bold,
    Docile,
    Relaxed,
    Impish,
    Lax,
    Timid,
    Hasty,
    Serious,
    Jolly,
    Naive,
    Modest,
    Mild,
    Quiet,
    Bashful,
    Rash,
    Calm,
    Gentle,
    Sassy,
    Careful,
    Quirky,
}

pub const NATURE_COUNT: u8 = 25;

impl Nature {
    pub const ALL: [Nature; NATURE_COUNT as usize] = [
        Nature::Hardy,
        Nature::Lonely,
        Nature::Brave,
        Nature::Adamant,
        Nature::Naughty,
        Nature::Bold,
        Nature::Docile,
        Nature::Relaxed,
        Nature::Impish,
        Nature::Lax,
        Nature::Timid,
        Nature::Hasty,
        Nature::Serious,
        Nature::Jolly,
        Nature::Naive,
        Nature::Modest,
        Nature::Mild,
        Nature::Quiet,
        Nature::Bashful,
        Nature::Rash,
        Nature::Calm,
        Nature::Gentle,
        Nature::Sassy,
        Nature::Careful,
        Nature::Quirky,
    ];

    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.get(id as usize).copied()
    }

    /// Bit `id + 1` of the nature mask. Bit 0 is never used.
    pub fn bit(self) -> u32 {
        1 << (u32::from(self.id()) + 1)
    }
}

impl From<Nature> for u8 {
    fn from(nature: Nature) -> u8 {
        nature.id()
    }
}

impl TryFrom<u8> for Nature {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_id(value).ok_or_else(|| format!("nature id {value} out of range"))
    }
}

pub fn nature_bit(nature: Nature) -> u32 {
    nature.bit()
}

pub fn unlocked_natures(mask: u32) -> Vec<Nature> {
    Nature::ALL.iter().copied().filter(|n| mask & n.bit() != 0).collect()
}

/// One random nature bit, used to repair caught entries with no nature.
pub fn random_nature_bit<R: Rng + ?Sized>(rng: &mut R) -> u32 {
    1 << rng.gen_range(1..=u32::from(NATURE_COUNT))
}
