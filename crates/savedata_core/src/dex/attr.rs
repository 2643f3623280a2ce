//! Dex attribute bitmask codec.
//!
//! Bits 0-6 hold the base attributes, grouped into three mutually exclusive
//! categories (shiny, gender, variant). Every bit from 7 upward is one form
//! index, so form count is unbounded and never collides with the base bits.

use num_bigint::BigUint;
use num_traits::Zero;
use serde::{Deserialize, Serialize};

pub const NON_SHINY: u64 = 1 << 0;
pub const SHINY: u64 = 1 << 1;
pub const MALE: u64 = 1 << 2;
pub const FEMALE: u64 = 1 << 3;
pub const DEFAULT_VARIANT: u64 = 1 << 4;
pub const VARIANT_2: u64 = 1 << 5;
pub const VARIANT_3: u64 = 1 << 6;
pub const DEFAULT_FORM: u64 = 1 << 7;

/// First bit of the form region.
pub const FORM_BIT_OFFSET: u64 = 7;

/// Mask of every base-attribute bit (0-6).
pub const BASE_ATTR_MASK: u64 = DEFAULT_FORM - 1;

/// Sprite variant tier. Tier 0 is the standard shiny sprite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum VariantTier {
    #[default]
    Standard,
    Rare,
    Epic,
}

impl VariantTier {
    pub const ALL: [VariantTier; 3] = [VariantTier::Standard, VariantTier::Rare, VariantTier::Epic];

    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    fn bit(self) -> u64 {
        match self {
            VariantTier::Standard => DEFAULT_VARIANT,
            VariantTier::Rare => VARIANT_2,
            VariantTier::Epic => VARIANT_3,
        }
    }
}

impl From<VariantTier> for u8 {
    fn from(tier: VariantTier) -> u8 {
        tier.index()
    }
}

impl TryFrom<u8> for VariantTier {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_index(value).ok_or_else(|| format!("variant tier {value} out of range"))
    }
}

/// One concrete attribute combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DexAttrProps {
    pub shiny: bool,
    pub female: bool,
    pub variant: VariantTier,
    pub form_index: u32,
}

#[inline]
pub(crate) fn has(mask: &BigUint, bit: u64) -> bool {
    // Every named bit is a single power of two below 2^8
    mask.bit(u64::from(bit.trailing_zeros()))
}

/// Exactly one bit from each base category.
pub fn encode_base_attrs(shiny: bool, female: bool, variant: VariantTier) -> BigUint {
    let shiny_bit = if shiny { SHINY } else { NON_SHINY };
    let gender_bit = if female { FEMALE } else { MALE };
    BigUint::from(shiny_bit | gender_bit | variant.bit())
}

/// `1 << (7 + form_index)`.
pub fn form_bit(form_index: u32) -> BigUint {
    BigUint::from(1u8) << (FORM_BIT_OFFSET as usize + form_index as usize)
}

/// Lowest set form index, or 0 when no form bit is present.
///
/// A malformed mask never panics; callers validate separately.
pub fn decode_form_index(mask: &BigUint) -> u32 {
    if mask.bits() <= FORM_BIT_OFFSET {
        return 0;
    }
    let forms = mask >> FORM_BIT_OFFSET as usize;
    forms.trailing_zeros().map_or(0, |z| u32::try_from(z).unwrap_or(0))
}

pub fn encode_props(props: &DexAttrProps) -> BigUint {
    encode_base_attrs(props.shiny, props.female, props.variant) | form_bit(props.form_index)
}

/// Read one combination back out of a single-combination mask.
pub fn decode_props(mask: &BigUint) -> DexAttrProps {
    let variant = if has(mask, VARIANT_3) {
        VariantTier::Epic
    } else if has(mask, VARIANT_2) {
        VariantTier::Rare
    } else {
        VariantTier::Standard
    };
    DexAttrProps {
        shiny: !has(mask, NON_SHINY),
        female: !has(mask, MALE),
        variant,
        form_index: decode_form_index(mask),
    }
}

/// Canonical display combination derived from accumulated caught history.
///
/// Optimistic mode shows the best unlocked shiny/variant (previews of what a
/// starter could become). Non-optimistic mode shows the most common confirmed
/// combination: non-shiny unless only shiny has been caught.
pub fn default_attrs_for_props(caught_attr: &BigUint, optimistic: bool) -> BigUint {
    let mut ret: u64 = 0;

    if optimistic {
        if has(caught_attr, SHINY) {
            ret |= SHINY;
            ret |= if has(caught_attr, VARIANT_3) {
                VARIANT_3
            } else if has(caught_attr, VARIANT_2) {
                VARIANT_2
            } else {
                DEFAULT_VARIANT
            };
        } else {
            ret |= NON_SHINY | DEFAULT_VARIANT;
        }
    } else {
        ret |= if has(caught_attr, NON_SHINY) || !has(caught_attr, SHINY) {
            NON_SHINY
        } else {
            SHINY
        };
        ret |= if has(caught_attr, DEFAULT_VARIANT) {
            DEFAULT_VARIANT
        } else if has(caught_attr, VARIANT_2) {
            VARIANT_2
        } else if has(caught_attr, VARIANT_3) {
            VARIANT_3
        } else {
            DEFAULT_VARIANT
        };
    }

    ret |= if has(caught_attr, MALE) || !has(caught_attr, FEMALE) { MALE } else { FEMALE };

    BigUint::from(ret) | form_bit(decode_form_index(caught_attr))
}

/// Luck contributed by a caught combination: 0 for non-shiny, else variant tier + 1.
pub fn luck(caught_attr: &BigUint) -> u8 {
    if !has(caught_attr, SHINY) {
        return 0;
    }
    if has(caught_attr, VARIANT_3) {
        3
    } else if has(caught_attr, VARIANT_2) {
        2
    } else {
        1
    }
}

/// Every form index set in an unlock mask, ascending.
pub fn unlocked_forms(mask: &BigUint) -> Vec<u32> {
    if mask.is_zero() {
        return Vec::new();
    }
    let top = mask.bits().saturating_sub(FORM_BIT_OFFSET);
    (0..top)
        .filter(|f| mask.bit(FORM_BIT_OFFSET + f))
        .filter_map(|f| u32::try_from(f).ok())
        .collect()
}

/// True when `mask` only uses bits a valid combination could set:
/// at least one bit per base category present and no stray bits.
pub fn is_well_formed(mask: &BigUint) -> bool {
    if mask.is_zero() {
        return true;
    }
    let shiny_ok = has(mask, SHINY) || has(mask, NON_SHINY);
    let gender_ok = has(mask, MALE) || has(mask, FEMALE);
    let variant_ok = has(mask, DEFAULT_VARIANT) || has(mask, VARIANT_2) || has(mask, VARIANT_3);
    let form_ok = mask.bits() > FORM_BIT_OFFSET;
    shiny_ok && gender_ok && variant_ok && form_ok
}
