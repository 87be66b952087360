#[macro_export]
macro_rules! sync_cycle_metrics {
    ($outcome:expr) => {{
        metrics::counter!("liquidity_sync_cycles_total", "outcome" => $outcome.to_string())
            .increment(1);
    }};
}

#[macro_export]
macro_rules! batch_failure_metrics {
    ($reason:expr) => {{
        metrics::counter!("liquidity_batch_failures_total", "reason" => $reason.to_string())
            .increment(1);
    }};
}

#[macro_export]
macro_rules! pruned_metrics {
    ($count:expr) => {{
        metrics::counter!("liquidity_pruned_total").increment($count as u64);
    }};
}

#[macro_export]
macro_rules! live_deposits_metrics {
    ($count:expr) => {{
        metrics::gauge!("liquidity_live_deposits").set($count as f64);
    }};
}

#[macro_export]
macro_rules! quote_metrics {
    ($outcome:expr) => {{
        metrics::counter!("liquidity_quotes_total", "outcome" => $outcome.to_string())
            .increment(1);
    }};
}
