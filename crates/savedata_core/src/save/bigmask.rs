//! Wire format for big-integer attribute masks.
//!
//! Fields tagged `#[serde(with = "bigmask")]` are written as JSON numbers while
//! they fit the machine-integer range used by older clients, and as decimal
//! strings above it. Reads accept a number, a decimal string or `null`.

use num_bigint::BigUint;
use num_traits::{FromPrimitive, ToPrimitive, Zero};
use serde::{de, Deserializer, Serializer};
use serde_json::Value;
use std::fmt;

/// Largest mask still written as a plain JSON number.
pub const MAX_INT_ATTR_VALUE: u64 = 0x8000_0000;

pub fn serialize<S: Serializer>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error> {
    match value.to_u64() {
        Some(v) if v <= MAX_INT_ATTR_VALUE => serializer.serialize_u64(v),
        _ => serializer.serialize_str(&value.to_str_radix(10)),
    }
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigUint, D::Error> {
    deserializer.deserialize_any(MaskVisitor)
}

/// Read a mask out of an untyped JSON tree (used by migrators).
pub fn from_value(value: &Value) -> Option<BigUint> {
    match value {
        Value::Null => Some(BigUint::zero()),
        Value::Number(n) => {
            if let Some(v) = n.as_u64() {
                Some(BigUint::from(v))
            } else {
                n.as_f64().filter(|f| *f >= 0.0 && f.fract() == 0.0).and_then(BigUint::from_f64)
            }
        }
        Value::String(s) => parse_decimal(s),
        _ => None,
    }
}

/// Inverse of [`from_value`], same encoding as [`serialize`].
pub fn to_value(mask: &BigUint) -> Value {
    match mask.to_u64() {
        Some(v) if v <= MAX_INT_ATTR_VALUE => Value::from(v),
        _ => Value::String(mask.to_str_radix(10)),
    }
}

fn parse_decimal(s: &str) -> Option<BigUint> {
    let s = s.trim();
    if s.is_empty() {
        return Some(BigUint::zero());
    }
    BigUint::parse_bytes(s.as_bytes(), 10)
}

struct MaskVisitor;

impl<'de> de::Visitor<'de> for MaskVisitor {
    type Value = BigUint;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a non-negative integer, decimal string or null")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<BigUint, E> {
        Ok(BigUint::from(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<BigUint, E> {
        u64::try_from(v)
            .map(BigUint::from)
            .map_err(|_| E::custom(format!("negative attribute mask {v}")))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<BigUint, E> {
        if v >= 0.0 && v.fract() == 0.0 {
            BigUint::from_f64(v).ok_or_else(|| E::custom(format!("invalid attribute mask {v}")))
        } else {
            Err(E::custom(format!("invalid attribute mask {v}")))
        }
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<BigUint, E> {
        parse_decimal(v).ok_or_else(|| E::custom(format!("invalid attribute mask string '{v}'")))
    }

    fn visit_unit<E: de::Error>(self) -> Result<BigUint, E> {
        Ok(BigUint::zero())
    }

    fn visit_none<E: de::Error>(self) -> Result<BigUint, E> {
        Ok(BigUint::zero())
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<BigUint, D::Error> {
        deserializer.deserialize_any(MaskVisitor)
    }
}
