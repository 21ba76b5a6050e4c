//! Bounded-concurrency fan-out over the market-data gateway.

use futures::stream::{self, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{CurrencyPair, TimeWindow};
use crate::error::ValidationError;
use crate::gateway::{GatewayError, MarketDataGateway, QueryMode, StatsQuery, TradeAggregate};

/// Hard cap on requested pairs per report. Larger batches are rejected
/// before any sub-query executes.
pub const MAX_PAIRS: usize = 50;

/// Cap on simultaneously in-flight sub-queries, regardless of batch size.
pub const MAX_IN_FLIGHT: usize = 50;

/// Result of one fan-out fetch. A pair with zero trades in the window
/// yields an all-zero statistic, never an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketStatistic {
    #[serde(flatten)]
    pub pair: CurrencyPair,
    pub count: u64,
    pub amount: f64,
    /// Volume-weighted average price in aggregate mode; the last trade
    /// price in last-trade mode.
    pub rate: f64,
    /// Close price of the window.
    pub last: f64,
}

impl MarketStatistic {
    fn zero(pair: CurrencyPair) -> Self {
        Self {
            pair,
            count: 0,
            amount: 0.0,
            rate: 0.0,
            last: 0.0,
        }
    }

    fn from_aggregate(pair: CurrencyPair, aggregate: TradeAggregate, mode: QueryMode) -> Self {
        let rate = match mode {
            QueryMode::Aggregate => aggregate.vwap,
            QueryMode::LastTrade => aggregate.close,
        };
        Self {
            pair,
            count: aggregate.count,
            amount: aggregate.base_volume,
            rate,
            last: aggregate.close,
        }
    }
}

/// Rejects batches larger than [`MAX_PAIRS`].
pub fn check_batch_size(requested: usize) -> Result<(), ValidationError> {
    if requested > MAX_PAIRS {
        return Err(ValidationError::TooManyPairs {
            requested,
            max: MAX_PAIRS,
        });
    }
    Ok(())
}

/// Issues one trade-statistics query per pair with at most
/// [`MAX_IN_FLIGHT`] in flight.
///
/// The output preserves input pair order regardless of completion order,
/// so positional correlation with the request stays valid. The first
/// sub-query error aborts the whole fan-out and is surfaced verbatim;
/// already-completed sub-results are discarded.
pub async fn fetch_all(
    gateway: &dyn MarketDataGateway,
    pairs: &[CurrencyPair],
    window: &TimeWindow,
    mode: QueryMode,
) -> Result<Vec<MarketStatistic>, GatewayError> {
    debug!(pairs = pairs.len(), ?mode, "fanning out trade-statistics queries");

    stream::iter(pairs.iter().cloned())
        .map(|pair| async move {
            let query = StatsQuery {
                pair: pair.clone(),
                start: window.start(),
                end: window.end(),
                mode,
            };
            let aggregate = gateway.trade_stats(query).await?;
            Ok(match aggregate {
                Some(aggregate) => MarketStatistic::from_aggregate(pair, aggregate, mode),
                None => MarketStatistic::zero(pair),
            })
        })
        .buffered(MAX_IN_FLIGHT)
        .try_collect()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::StaticMarketData;
    use crate::domain::{Currency, TimeWindow};

    fn issued(code: &str, issuer: &str) -> Currency {
        Currency::Issued {
            code: code.to_owned(),
            issuer: issuer.to_owned(),
            name: None,
        }
    }

    fn pair(code: &str, issuer: &str) -> CurrencyPair {
        CurrencyPair::native_quoted(issued(code, issuer))
    }

    fn aggregate(vwap: f64) -> TradeAggregate {
        TradeAggregate {
            base_volume: 100.0,
            count: 5,
            close: vwap * 1.5,
            vwap,
        }
    }

    #[tokio::test]
    async fn preserves_input_order_regardless_of_completion_order() {
        let slow = pair("USD", "rSlowIssuer");
        let fast = pair("BTC", "rFastIssuer");
        let gateway = StaticMarketData::new()
            .with_stat(&slow, aggregate(2.0))
            .with_delay(&slow, std::time::Duration::from_millis(50))
            .with_stat(&fast, aggregate(3.0));

        let window = TimeWindow::named_at(
            crate::domain::NamedRange::Day,
            time::OffsetDateTime::from_unix_timestamp(1_700_000_000).expect("in range"),
        );
        let statistics = fetch_all(
            &gateway,
            &[slow.clone(), fast.clone()],
            &window,
            QueryMode::Aggregate,
        )
        .await
        .expect("fan-out must succeed");

        assert_eq!(statistics.len(), 2);
        assert_eq!(statistics[0].pair, slow);
        assert_eq!(statistics[0].rate, 2.0);
        assert_eq!(statistics[1].pair, fast);
        assert_eq!(statistics[1].rate, 3.0);
    }

    #[tokio::test]
    async fn zero_trades_is_a_zero_statistic_not_an_error() {
        let gateway = StaticMarketData::new();
        let pairs = vec![pair("USD", "rSomeIssuer")];
        let window = TimeWindow::since_genesis();

        let statistics = fetch_all(&gateway, &pairs, &window, QueryMode::Aggregate)
            .await
            .expect("fan-out must succeed");

        assert_eq!(statistics.len(), 1);
        assert_eq!(statistics[0].rate, 0.0);
        assert_eq!(statistics[0].count, 0);
        assert_eq!(statistics[0].amount, 0.0);
    }

    #[tokio::test]
    async fn first_error_aborts_the_fanout() {
        let gateway = StaticMarketData::failing("couch view timed out");
        let pairs = vec![pair("USD", "rOneIssuer"), pair("BTC", "rTwoIssuer")];
        let window = TimeWindow::since_genesis();

        let err = fetch_all(&gateway, &pairs, &window, QueryMode::Aggregate)
            .await
            .expect_err("fan-out must fail");
        assert_eq!(err, GatewayError::MarketData("couch view timed out".to_owned()));
    }

    #[tokio::test]
    async fn last_trade_mode_uses_the_close_price_as_the_rate() {
        let target = pair("USD", "rSomeIssuer");
        let gateway = StaticMarketData::new().with_stat(
            &target,
            TradeAggregate {
                base_volume: 10.0,
                count: 1,
                close: 7.5,
                vwap: 0.0,
            },
        );
        let window = TimeWindow::since_genesis();

        let statistics = fetch_all(&gateway, &[target], &window, QueryMode::LastTrade)
            .await
            .expect("fan-out must succeed");
        assert_eq!(statistics[0].rate, 7.5);
        assert_eq!(statistics[0].last, 7.5);
    }

    #[test]
    fn oversized_batches_are_rejected() {
        assert!(check_batch_size(MAX_PAIRS).is_ok());
        let err = check_batch_size(MAX_PAIRS + 1).expect_err("must fail");
        assert!(matches!(err, ValidationError::TooManyPairs { .. }));
    }
}
