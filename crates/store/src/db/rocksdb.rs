use std::{path::Path, sync::Arc};

use rocksdb::{ColumnFamily, DB, WriteBatch};
use tracing::debug;
use types::errors::LiquidityError;

use crate::db::{SetStore, decode_ids, encode_ids, pruned_key, targeted_key};
use crate::sets::DepositIdSets;

const PRUNED_CF: &str = "pruned_deposit_ids";
const TARGETED_CF: &str = "targeted_deposit_ids";

#[derive(Clone)]
pub struct RocksSetStore {
    pub db: Arc<DB>,
}

impl RocksSetStore {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, LiquidityError> {
        let mut opts = rocksdb::Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let db = DB::open_cf(&opts, path, [PRUNED_CF, TARGETED_CF])?;
        Ok(Self { db: Arc::new(db) })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily, LiquidityError> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| LiquidityError::Storage(format!("missing column family {name}")))
    }
}

impl SetStore for RocksSetStore {
    fn load(&self, scope: &str) -> Result<DepositIdSets, LiquidityError> {
        let pruned = self
            .db
            .get_cf(self.cf(PRUNED_CF)?, pruned_key(scope))?
            .map(|bytes| decode_ids(&bytes))
            .transpose()?
            .unwrap_or_default();
        let targeted = self
            .db
            .get_cf(self.cf(TARGETED_CF)?, targeted_key(scope))?
            .map(|bytes| decode_ids(&bytes))
            .transpose()?
            .unwrap_or_default();

        debug!(
            scope,
            pruned = pruned.len(),
            targeted = targeted.len(),
            "Loaded deposit id sets"
        );
        Ok(DepositIdSets::new(pruned, targeted))
    }

    fn save(&self, scope: &str, sets: &DepositIdSets) -> Result<(), LiquidityError> {
        let mut batch = WriteBatch::default();
        batch.put_cf(self.cf(PRUNED_CF)?, pruned_key(scope), encode_ids(&sets.pruned)?);
        batch.put_cf(
            self.cf(TARGETED_CF)?,
            targeted_key(scope),
            encode_ids(&sets.targeted)?,
        );
        self.db.write(batch)?;
        Ok(())
    }
}
