use std::time::Duration;

use alloy_primitives::U256;
use tokio::{runtime::Handle, task::JoinHandle, time::interval};
use tracing::{debug, info, warn};

use crate::engine::LiquidityEngine;

/// Polls the active ledger's deposit counter and starts a cycle whenever it
/// moves or the active ledger changes.
pub fn start_counter_watch(engine: LiquidityEngine, poll_interval: Duration) -> JoinHandle<()> {
    Handle::current().spawn(async move {
        let mut ticker = interval(poll_interval);
        let mut last_seen: Option<(String, U256)> = None;
        loop {
            ticker.tick().await;

            let Some(ledger) = engine.current_ledger() else {
                last_seen = None;
                continue;
            };

            let counter = match engine.fetch_counter(&ledger).await {
                Ok(counter) => counter,
                Err(e) => {
                    warn!(identity = %ledger.identity, "Failed to poll deposit counter: {e}");
                    continue;
                }
            };

            let changed = last_seen
                .as_ref()
                .is_none_or(|(identity, seen)| identity != &ledger.identity || *seen != counter);
            if changed {
                info!(
                    identity = %ledger.identity,
                    counter = %counter,
                    "Deposit counter changed, starting sync cycle"
                );
                last_seen = Some((ledger.identity, counter));
                // Outcomes are logged by the cycle itself.
                drop(engine.refetch());
            } else {
                debug!(identity = %ledger.identity, "Deposit counter unchanged");
            }
        }
    })
}
