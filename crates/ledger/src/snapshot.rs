use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use tracing::debug;
use types::{
    deposit::{DepositId, RawDepositRecord},
    errors::LiquidityError,
};

use crate::ledger::LedgerReader;

/// On-disk dump of a ledger's deposits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSnapshot {
    #[serde(with = "types::decimal")]
    pub deposit_counter: U256,
    #[serde(default)]
    pub deposits: Vec<RawDepositRecord>,
}

/// Ledger reader backed by a JSON [`LedgerSnapshot`] file.
///
/// The file is re-read on every call so an external process can rewrite it
/// between cycles.
#[derive(Debug, Clone)]
pub struct SnapshotLedger {
    path: PathBuf,
}

impl SnapshotLedger {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> Result<LedgerSnapshot, LiquidityError> {
        let contents = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            LiquidityError::Ledger(format!(
                "Failed to read ledger snapshot {}: {e}",
                self.path.display()
            ))
        })?;

        serde_json::from_str(&contents).map_err(|e| {
            LiquidityError::Ledger(format!(
                "Failed to parse ledger snapshot {}: {e}",
                self.path.display()
            ))
        })
    }
}

#[async_trait::async_trait]
impl LedgerReader for SnapshotLedger {
    async fn get_deposit_counter(&self) -> Result<U256, LiquidityError> {
        Ok(self.load().await?.deposit_counter)
    }

    async fn get_deposits_by_ids(
        &self,
        ids: &[DepositId],
    ) -> Result<Vec<RawDepositRecord>, LiquidityError> {
        let snapshot = self.load().await?;
        let wanted: HashSet<&DepositId> = ids.iter().collect();
        let deposits: Vec<RawDepositRecord> = snapshot
            .deposits
            .into_iter()
            .filter(|deposit| wanted.contains(&deposit.deposit_id))
            .collect();

        debug!(
            path = %self.path.display(),
            requested = ids.len(),
            found = deposits.len(),
            "Read deposits from snapshot"
        );
        Ok(deposits)
    }
}
