//! Read-only first-fit matching over a ranked [`DepositStore`].
//!
//! Because the store is already ranked, the first eligible deposit is the
//! best one; nothing here sorts or mutates.

use alloy_primitives::U256;
use tracing::debug;
use types::{
    deposit::{DepositIdSet, StoredDeposit},
    quote::{IndicativeQuote, Quote, QuoteError},
    quote_metrics,
    units::{
        RateOrientation, fiat_display, fiat_from_settlement, settlement_display,
        to_settlement_units,
    },
};

use crate::store_builder::DepositStore;

/// Who is asking and which deposits they may be matched with.
#[derive(Debug, Clone, Copy)]
pub struct QuoteFilter<'a> {
    /// Identity whose own deposits are never offered back to it.
    pub exclude_depositor: &'a str,
    /// When non-empty, only these deposits are considered.
    pub restrict_to: &'a DepositIdSet,
}

impl QuoteFilter<'_> {
    fn admits(&self, deposit: &StoredDeposit) -> bool {
        (self.restrict_to.is_empty() || self.restrict_to.contains(&deposit.deposit_id))
            && !deposit.is_owned_by(self.exclude_depositor)
    }
}

fn record(quote: IndicativeQuote) -> IndicativeQuote {
    let outcome = match quote.as_error() {
        None => "matched",
        Some(QuoteError::InvalidAmount) => "invalid_amount",
        Some(QuoteError::Overflow) => "overflow",
        Some(QuoteError::StoreEmpty) => "store_empty",
        Some(QuoteError::NoLiquidity) => "no_liquidity",
    };
    quote_metrics!(outcome);
    quote
}

/// Prices `settlement_amount` against `deposit`.
#[must_use]
pub fn price(
    deposit: &StoredDeposit,
    settlement_amount: U256,
    orientation: RateOrientation,
) -> IndicativeQuote {
    match fiat_from_settlement(settlement_amount, deposit.conversion_rate(), orientation) {
        Ok(fiat) => IndicativeQuote::Quote(Quote {
            deposit_id: deposit.deposit_id,
            settlement_amount,
            settlement_amount_display: settlement_display(settlement_amount),
            fiat_amount_to_send: fiat,
            fiat_amount_display: fiat_display(fiat),
            conversion_rate: deposit.conversion_rate(),
        }),
        Err(e) => IndicativeQuote::error(e.into()),
    }
}

/// Quotes a human-entered settlement amount such as `"12.5"`.
#[must_use]
pub fn match_quote(
    store: Option<&DepositStore>,
    requested_amount: &str,
    filter: QuoteFilter<'_>,
    orientation: RateOrientation,
) -> IndicativeQuote {
    let requested = match to_settlement_units(requested_amount) {
        Ok(units) => units,
        Err(e) => return record(IndicativeQuote::error(e.into())),
    };
    let Some(store) = store else {
        return record(IndicativeQuote::error(QuoteError::StoreEmpty));
    };

    let quote = store
        .iter()
        .filter(|deposit| filter.admits(deposit))
        .find(|deposit| deposit.available_liquidity >= requested)
        .map_or_else(
            || IndicativeQuote::error(QuoteError::NoLiquidity),
            |deposit| {
                debug!(
                    deposit_id = %deposit.deposit_id,
                    rank = deposit.rank,
                    requested = %requested,
                    "Matched deposit"
                );
                price(deposit, requested, orientation)
            },
        );
    record(quote)
}

/// Quotes the largest transfer up to `max_amount`: the first eligible
/// deposit that can fill all of it, else the eligible deposit with the most
/// liquidity for what it has.
#[must_use]
pub fn match_max_available(
    store: Option<&DepositStore>,
    max_amount: U256,
    filter: QuoteFilter<'_>,
    orientation: RateOrientation,
) -> IndicativeQuote {
    if max_amount.is_zero() {
        return record(IndicativeQuote::error(QuoteError::InvalidAmount));
    }
    let Some(store) = store else {
        return record(IndicativeQuote::error(QuoteError::StoreEmpty));
    };

    let mut largest: Option<&StoredDeposit> = None;
    for deposit in store.iter().filter(|deposit| filter.admits(deposit)) {
        if deposit.available_liquidity >= max_amount {
            return record(price(deposit, max_amount, orientation));
        }
        // Strictly greater keeps the better-ranked deposit on ties.
        if largest.is_none_or(|l| deposit.available_liquidity > l.available_liquidity) {
            largest = Some(deposit);
        }
    }

    let quote = largest
        .filter(|deposit| !deposit.available_liquidity.is_zero())
        .map_or_else(
            || IndicativeQuote::error(QuoteError::NoLiquidity),
            |deposit| price(deposit, deposit.available_liquidity, orientation),
        );
    record(quote)
}
