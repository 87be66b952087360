//! Serde helpers that keep 256-bit integers as decimal strings.
//!
//! Persisted id sets and ledger snapshots carry `uint256` values as
//! decimal strings; plain JSON numbers are accepted on input when they fit
//! in a `u64`, and `0x`-prefixed hex is accepted for ledger dumps.

use std::fmt;

use alloy_primitives::U256;
use serde::{
    Deserializer, Serializer,
    de::{self, Visitor},
};

use crate::errors::LiquidityError;

pub fn parse_u256(value: &str) -> Result<U256, LiquidityError> {
    let trimmed = value.trim();
    let parsed = if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        if hex.is_empty() {
            return Err(LiquidityError::MalformedRecord(format!(
                "empty hex integer: {value:?}"
            )));
        }
        U256::from_str_radix(hex, 16)
    } else {
        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(LiquidityError::MalformedRecord(format!(
                "not a decimal integer: {value:?}"
            )));
        }
        U256::from_str_radix(trimmed, 10)
    };

    parsed.map_err(|e| LiquidityError::MalformedRecord(format!("{value:?}: {e}")))
}

pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_string())
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
    deserializer.deserialize_any(U256Visitor)
}

struct U256Visitor;

impl Visitor<'_> for U256Visitor {
    type Value = U256;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a decimal string, 0x-prefixed hex string or unsigned integer")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<U256, E> {
        Ok(U256::from(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<U256, E> {
        u64::try_from(v)
            .map(U256::from)
            .map_err(|_| E::custom(format!("negative integer {v}")))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<U256, E> {
        parse_u256(v).map_err(E::custom)
    }
}

/// `#[serde(with = "types::decimal::vec")]` for sequences of U256.
pub mod vec {
    use alloy_primitives::U256;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    #[serde(transparent)]
    struct Wrapped(#[serde(with = "crate::decimal")] U256);

    pub fn serialize<S: Serializer>(values: &[U256], serializer: S) -> Result<S::Ok, S::Error> {
        let wrapped: Vec<Wrapped> = values.iter().copied().map(Wrapped).collect();
        wrapped.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<U256>, D::Error> {
        let wrapped = Vec::<Wrapped>::deserialize(deserializer)?;
        Ok(wrapped.into_iter().map(|w| w.0).collect())
    }
}
