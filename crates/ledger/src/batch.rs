use std::{collections::HashSet, time::Duration};

use alloy_primitives::U256;
use tokio::time::timeout;
use tracing::{debug, warn};
use types::{
    batch_failure_metrics,
    deposit::{DepositId, RawDepositRecord},
    errors::LiquidityError,
};

use crate::ledger::LedgerReader;

pub const DEFAULT_BATCH_SIZE: usize = 50;
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Splits id lists into bounded reads and swallows per-batch failures.
///
/// A failed or timed-out batch yields no records: its ids stay candidates
/// for the next cycle and are never treated as exhausted.
#[derive(Debug, Clone, Copy)]
pub struct BatchedReader {
    batch_size: usize,
    fetch_timeout: Duration,
}

impl Default for BatchedReader {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_SIZE, DEFAULT_FETCH_TIMEOUT)
    }
}

impl BatchedReader {
    #[must_use]
    pub fn new(batch_size: usize, fetch_timeout: Duration) -> Self {
        Self {
            batch_size: batch_size.max(1),
            fetch_timeout,
        }
    }

    #[must_use]
    pub const fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Reads the deposit counter under the same timeout as batch reads.
    pub async fn fetch_counter(&self, reader: &dyn LedgerReader) -> Result<U256, LiquidityError> {
        timeout(self.fetch_timeout, reader.get_deposit_counter())
            .await
            .map_err(|_| {
                LiquidityError::Timeout(format!(
                    "deposit counter after {:?}",
                    self.fetch_timeout
                ))
            })?
    }

    pub fn batches<'a>(&self, ids: &'a [DepositId]) -> impl Iterator<Item = &'a [DepositId]> {
        ids.chunks(self.batch_size)
    }

    pub async fn fetch_batch(
        &self,
        reader: &dyn LedgerReader,
        ids: &[DepositId],
    ) -> Vec<RawDepositRecord> {
        match self.try_fetch_batch(reader, ids).await {
            Ok(records) => records,
            Err(e) => {
                warn!(
                    batch_start = %ids.first().copied().unwrap_or_default(),
                    batch_len = ids.len(),
                    "Error fetching deposits batch: {}",
                    e
                );
                match e {
                    LiquidityError::Timeout(_) => batch_failure_metrics!("timeout"),
                    _ => batch_failure_metrics!("error"),
                }
                Vec::new()
            }
        }
    }

    async fn try_fetch_batch(
        &self,
        reader: &dyn LedgerReader,
        ids: &[DepositId],
    ) -> Result<Vec<RawDepositRecord>, LiquidityError> {
        let records = timeout(self.fetch_timeout, reader.get_deposits_by_ids(ids))
            .await
            .map_err(|_| {
                LiquidityError::Timeout(format!(
                    "batch of {} deposits after {:?}",
                    ids.len(),
                    self.fetch_timeout
                ))
            })??;

        let requested: HashSet<&DepositId> = ids.iter().collect();
        let mut seen = HashSet::with_capacity(records.len());
        let mut accepted = Vec::with_capacity(records.len());
        for record in records {
            if !requested.contains(&record.deposit_id) || !seen.insert(record.deposit_id) {
                debug!(
                    deposit_id = %record.deposit_id,
                    "Dropping deposit record that was not requested in this batch"
                );
                continue;
            }
            accepted.push(record);
        }

        Ok(accepted)
    }
}
