use types::deposit::{DepositId, DepositIdSet};

/// The two persisted id sets of one ledger identity.
///
/// `targeted` never shares an id with `pruned` once [`Self::reconcile`] has
/// run, and every mutation here runs it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DepositIdSets {
    pub pruned: DepositIdSet,
    pub targeted: DepositIdSet,
}

impl DepositIdSets {
    #[must_use]
    pub fn new(pruned: DepositIdSet, targeted: DepositIdSet) -> Self {
        let mut sets = Self { pruned, targeted };
        sets.reconcile();
        sets
    }

    /// Drops targeted ids that have been pruned. Returns how many were dropped.
    pub fn reconcile(&mut self) -> usize {
        let before = self.targeted.len();
        let pruned = &self.pruned;
        self.targeted.retain(|id| !pruned.contains(id));
        before - self.targeted.len()
    }

    /// Adds exhausted ids to the pruned set and reconciles the targeted set.
    /// Returns the number of ids that were not already pruned.
    pub fn prune(&mut self, exhausted: impl IntoIterator<Item = DepositId>) -> usize {
        let added = exhausted
            .into_iter()
            .filter(|id| self.pruned.insert(*id))
            .count();
        if added > 0 {
            self.reconcile();
        }
        added
    }

    /// Replaces the targeted set; ids that are already pruned are ignored.
    pub fn set_targeted(&mut self, ids: impl IntoIterator<Item = DepositId>) {
        self.targeted = ids.into_iter().collect();
        self.reconcile();
    }

    #[must_use]
    pub fn is_pruned(&self, id: &DepositId) -> bool {
        self.pruned.contains(id)
    }
}
