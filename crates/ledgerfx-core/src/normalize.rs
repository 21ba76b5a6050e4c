//! Exchange-rate resolution over the currency graph.
//!
//! Every component statistic prices some currency against the native
//! unit, so converting a whole report into a caller-chosen target takes
//! one scalar: the native-to-target exchange rate. That scalar is read
//! out of the statistics already in hand when possible, and otherwise
//! costs exactly one extra conversion query.

use crate::domain::{Currency, CurrencyPair};
use crate::fanout::MarketStatistic;

/// Outcome of resolving the native-to-target exchange rate from
/// statistics already in hand.
#[derive(Debug, Clone, PartialEq)]
pub enum RateResolution {
    /// Scalar applied to native-unit values to express them in the target
    /// currency.
    Resolved(f64),
    /// No usable statistic; the caller must run this one conversion query
    /// over the same window.
    NeedsConversion(CurrencyPair),
}

/// Resolves the exchange rate from the native unit to `target`.
///
/// The native unit itself always resolves to 1. A `(target, native)`
/// statistic prices the native unit in target terms, so its reciprocal is
/// used. A `(native, target)` statistic is already the conversion
/// direction and its rate is used as-is. Zero-rate statistics are skipped:
/// zero volume cannot establish a rate.
pub fn resolve_exchange_rate(
    statistics: &[MarketStatistic],
    target: &Currency,
) -> RateResolution {
    if target.is_native() {
        return RateResolution::Resolved(1.0);
    }

    for statistic in statistics {
        if statistic.pair.counter.is_native()
            && &statistic.pair.base == target
            && statistic.rate != 0.0
        {
            return RateResolution::Resolved(1.0 / statistic.rate);
        }
    }

    for statistic in statistics {
        if statistic.pair.base.is_native()
            && &statistic.pair.counter == target
            && statistic.rate != 0.0
        {
            return RateResolution::Resolved(statistic.rate);
        }
    }

    RateResolution::NeedsConversion(CurrencyPair {
        base: Currency::Native,
        counter: target.clone(),
    })
}
