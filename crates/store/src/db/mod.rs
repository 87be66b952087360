use types::errors::LiquidityError;

use crate::sets::DepositIdSets;

pub mod memory;
pub mod rocksdb;

pub const PRUNED_KEY_PREFIX: &str = "prunedDepositIds_";
pub const TARGETED_KEY_PREFIX: &str = "targetedDepositIds_";

/// Durable storage for the id sets, scoped by ledger identity.
///
/// A scope that was never saved loads as empty sets, not as an error.
/// `save` writes both sets together or neither.
pub trait SetStore: Send + Sync {
    fn load(&self, scope: &str) -> Result<DepositIdSets, LiquidityError>;
    fn save(&self, scope: &str, sets: &DepositIdSets) -> Result<(), LiquidityError>;
}

#[must_use]
pub fn pruned_key(scope: &str) -> String {
    format!("{PRUNED_KEY_PREFIX}{scope}")
}

#[must_use]
pub fn targeted_key(scope: &str) -> String {
    format!("{TARGETED_KEY_PREFIX}{scope}")
}

/// JSON array of decimal strings.
pub(crate) fn encode_ids<'a>(
    ids: impl IntoIterator<Item = &'a types::deposit::DepositId>,
) -> Result<Vec<u8>, LiquidityError> {
    let ids: Vec<_> = ids.into_iter().copied().collect();
    Ok(serde_json::to_vec(&IdList(ids))?)
}

pub(crate) fn decode_ids(bytes: &[u8]) -> Result<types::deposit::DepositIdSet, LiquidityError> {
    let IdList(ids) = serde_json::from_slice(bytes)?;
    Ok(ids.into_iter().collect())
}

#[derive(serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
struct IdList(#[serde(with = "types::decimal::vec")] Vec<types::deposit::DepositId>);
