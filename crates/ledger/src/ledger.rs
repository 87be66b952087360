use alloy_primitives::U256;
use dyn_clone::DynClone;
use types::{
    deposit::{DepositId, RawDepositRecord},
    errors::LiquidityError,
};

/// Read access to the escrow contract holding deposits.
#[async_trait::async_trait]
pub trait LedgerReader: Send + DynClone + Sync {
    /// Number of deposits ever created; ids are dense in `0..counter`.
    async fn get_deposit_counter(&self) -> Result<U256, LiquidityError>;

    /// Deposits for the given ids. Ids the ledger does not know are left out
    /// of the response rather than reported as errors.
    async fn get_deposits_by_ids(
        &self,
        ids: &[DepositId],
    ) -> Result<Vec<RawDepositRecord>, LiquidityError>;
}

dyn_clone::clone_trait_object!(LedgerReader);

/// The contract a synchronization cycle reads from, named by the identity
/// under which its pruned and targeted sets are persisted.
#[derive(Clone)]
pub struct LedgerContext {
    pub identity: String,
    pub reader: Box<dyn LedgerReader>,
}

impl LedgerContext {
    #[must_use]
    pub fn new(identity: impl Into<String>, reader: Box<dyn LedgerReader>) -> Self {
        Self {
            identity: identity.into(),
            reader,
        }
    }
}

impl std::fmt::Debug for LedgerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerContext")
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}
