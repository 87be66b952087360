pub mod adapter;
pub mod batch;
pub mod ledger;
pub mod mock;
pub mod snapshot;
