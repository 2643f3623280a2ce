// Dex unlock tracking
// Big-integer attribute masks, nature masks and the per-species ledger

pub mod attr;
pub mod entry;
pub mod ledger;
pub mod nature;

pub use attr::{
    decode_form_index, decode_props, default_attrs_for_props, encode_base_attrs, encode_props,
    form_bit, luck, DexAttrProps, VariantTier,
};
pub use entry::DexEntry;
pub use ledger::{CatchRecord, DexLedger};
pub use nature::{nature_bit, random_nature_bit, unlocked_natures, Nature};
