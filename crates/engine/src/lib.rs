pub mod config;
pub mod engine;
pub mod matcher;
pub mod store_builder;
pub mod synchronizer;
pub mod telemetry;
pub mod watcher;

pub use engine::LiquidityEngine;
pub use store_builder::{DepositStore, RankingPolicy};
pub use synchronizer::{CycleOutcome, SyncPhase, SyncStatus};

#[cfg(test)]
mod tests;
