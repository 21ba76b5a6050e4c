//! The three report assemblers.
//!
//! Each operation resolves its time window, consults the cache, and on a
//! miss drives the fan-out, rate normalization, and write-back. No report
//! is ever partially populated: the first error wins and nothing is
//! returned alongside it.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::Duration;
use tracing::debug;

use crate::cache::{CacheGateway, CacheKey, ReportKind, TtlClass};
use crate::domain::{
    Currency, CurrencyPair, NamedRange, RawCurrency, RawCurrencyPair, TimeWindow,
};
use crate::error::{EngineError, ValidationError};
use crate::fanout::{self, MarketStatistic};
use crate::gateway::{
    IssuerCapitalizationGateway, LedgerSnapshotGateway, MarketDataGateway, QueryMode, StatsQuery,
};
use crate::normalize::{resolve_exchange_rate, RateResolution};
use crate::registry::GatewayRegistry;

/// Conversion rates for a network-value snapshot are averaged over the
/// 72 hours preceding the snapshot time.
const VALUE_LOOKBACK: Duration = Duration::hours(72);

/// Pairwise exchange-rates request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExchangeRatesRequest {
    /// Explicit pair list; alternatively a single `base`/`counter`.
    pub pairs: Option<Vec<RawCurrencyPair>>,
    pub base: Option<RawCurrency>,
    pub counter: Option<RawCurrency>,
    /// Averaging range, defaults to `day`.
    pub range: Option<NamedRange>,
    /// Retrieve only the last traded price (faster query).
    pub last: bool,
}

/// One surviving pair in an exchange-rates response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairRate {
    pub base: Currency,
    pub counter: Currency,
    /// Volume-weighted average price; absent in last-price mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<f64>,
    /// Last trade price.
    pub last: f64,
}

/// Top-markets request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TopMarketsRequest {
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    /// Target currency, defaults to the native unit.
    pub exchange: Option<RawCurrency>,
}

/// Aggregate trading volume across the known markets, normalized into the
/// requested currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopMarketsReport {
    pub start_time: String,
    pub end_time: String,
    pub exchange: Currency,
    pub exchange_rate: f64,
    pub total: f64,
    pub count: u64,
    pub components: Vec<MarketComponent>,
}

/// One component market inside a top-markets report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketComponent {
    #[serde(flatten)]
    pub pair: CurrencyPair,
    pub rate: f64,
    pub count: u64,
    pub amount: f64,
    pub converted_amount: f64,
}

/// Total-network-value request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NetworkValueRequest {
    /// Snapshot time, defaults to now.
    pub time: Option<String>,
    /// Target currency, defaults to the native unit.
    pub exchange: Option<RawCurrency>,
}

/// Total value of issued currencies plus the native supply, normalized
/// into the requested currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkValueReport {
    pub time: String,
    pub exchange: Currency,
    pub exchange_rate: f64,
    pub total: f64,
    pub components: Vec<ValueComponent>,
}

/// One component currency inside a network-value report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueComponent {
    #[serde(flatten)]
    pub currency: Currency,
    pub amount: f64,
    pub rate: f64,
    pub converted_amount: f64,
}

/// Report engine over injected collaborators.
///
/// One instance serves many concurrent requests; all per-request state is
/// local to the operation call.
pub struct ReportEngine {
    market_data: Arc<dyn MarketDataGateway>,
    capitalization: Arc<dyn IssuerCapitalizationGateway>,
    ledger: Arc<dyn LedgerSnapshotGateway>,
    registry: GatewayRegistry,
    cache: CacheGateway,
}

impl std::fmt::Debug for ReportEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportEngine").finish_non_exhaustive()
    }
}

impl ReportEngine {
    pub fn new(
        market_data: Arc<dyn MarketDataGateway>,
        capitalization: Arc<dyn IssuerCapitalizationGateway>,
        ledger: Arc<dyn LedgerSnapshotGateway>,
        registry: GatewayRegistry,
        cache: CacheGateway,
    ) -> Self {
        Self {
            market_data,
            capitalization,
            ledger,
            registry,
            cache,
        }
    }

    /// Exchange rate (volume-weighted average and last price, or last
    /// price only) for each requested pair. Pairs with zero computed rate
    /// are dropped from the result.
    pub async fn exchange_rates(
        &self,
        request: ExchangeRatesRequest,
    ) -> Result<Vec<PairRate>, EngineError> {
        let raw_pairs = match (request.pairs, request.base, request.counter) {
            (Some(pairs), _, _) => pairs,
            (None, Some(base), Some(counter)) => vec![RawCurrencyPair { base, counter }],
            _ => return Err(ValidationError::MissingPairs.into()),
        };
        fanout::check_batch_size(raw_pairs.len())?;

        let pairs = raw_pairs
            .iter()
            .map(|raw| CurrencyPair::parse(raw, &self.registry))
            .collect::<Result<Vec<_>, _>>()?;

        let (window, mode) = if request.last {
            (TimeWindow::since_genesis(), QueryMode::LastTrade)
        } else {
            let range = request.range.unwrap_or(NamedRange::Day);
            (TimeWindow::named(range), QueryMode::Aggregate)
        };

        let statistics =
            fanout::fetch_all(self.market_data.as_ref(), &pairs, &window, mode).await?;

        Ok(statistics
            .into_iter()
            .filter(|statistic| statistic.rate != 0.0)
            .map(|statistic| PairRate {
                base: statistic.pair.base,
                counter: statistic.pair.counter,
                rate: (!request.last).then_some(statistic.rate),
                last: statistic.last,
            })
            .collect())
    }

    /// Total trading volume for the known markets over the window,
    /// normalized into the requested currency.
    pub async fn top_markets(
        &self,
        request: TopMarketsRequest,
    ) -> Result<TopMarketsReport, EngineError> {
        let exchange = self.exchange_currency(request.exchange.as_ref())?;
        let window =
            TimeWindow::resolve(request.start_time.as_deref(), request.end_time.as_deref())?;
        let key = CacheKey::build(ReportKind::TopMarkets, &exchange, &window);

        self.cache
            .cached_or_compute(&key, TtlClass::for_window(&window), || {
                self.compute_top_markets(exchange, window)
            })
            .await
    }

    /// History probe: whether a top-markets report for these parameters is
    /// already cached.
    pub async fn top_markets_cached(
        &self,
        request: &TopMarketsRequest,
    ) -> Result<bool, EngineError> {
        let exchange = self.exchange_currency(request.exchange.as_ref())?;
        let window =
            TimeWindow::resolve(request.start_time.as_deref(), request.end_time.as_deref())?;
        let key = CacheKey::build(ReportKind::TopMarkets, &exchange, &window);
        Ok(self.cache.probe(&key).await?)
    }

    /// Total value of issued currencies plus the native supply as of the
    /// snapshot time, normalized into the requested currency.
    pub async fn total_network_value(
        &self,
        request: NetworkValueRequest,
    ) -> Result<NetworkValueReport, EngineError> {
        let exchange = self.exchange_currency(request.exchange.as_ref())?;
        let window = TimeWindow::snapshot(request.time.as_deref(), VALUE_LOOKBACK)?;
        let key = CacheKey::build(ReportKind::NetworkValue, &exchange, &window);

        self.cache
            .cached_or_compute(&key, TtlClass::for_window(&window), || {
                self.compute_network_value(exchange, window)
            })
            .await
    }

    /// History probe: whether a network-value report for these parameters
    /// is already cached.
    pub async fn total_network_value_cached(
        &self,
        request: &NetworkValueRequest,
    ) -> Result<bool, EngineError> {
        let exchange = self.exchange_currency(request.exchange.as_ref())?;
        let window = TimeWindow::snapshot(request.time.as_deref(), VALUE_LOOKBACK)?;
        let key = CacheKey::build(ReportKind::NetworkValue, &exchange, &window);
        Ok(self.cache.probe(&key).await?)
    }

    async fn compute_top_markets(
        &self,
        exchange: Currency,
        window: TimeWindow,
    ) -> Result<TopMarketsReport, EngineError> {
        let pairs = self.registry.market_pairs();
        let statistics =
            fanout::fetch_all(self.market_data.as_ref(), &pairs, &window, QueryMode::Aggregate)
                .await?;
        let exchange_rate = self.exchange_rate_for(&statistics, &exchange, &window).await?;

        let mut total = 0.0;
        let mut count = 0;
        let mut components = Vec::with_capacity(statistics.len());
        for statistic in statistics {
            let rate = statistic.rate * exchange_rate;
            let converted_amount = statistic.amount * rate;
            total += converted_amount;
            count += statistic.count;
            components.push(MarketComponent {
                pair: statistic.pair,
                rate,
                count: statistic.count,
                amount: statistic.amount,
                converted_amount,
            });
        }

        Ok(TopMarketsReport {
            start_time: window.start_rfc3339(),
            end_time: window.end_rfc3339(),
            exchange,
            exchange_rate,
            total,
            count,
            components,
        })
    }

    async fn compute_network_value(
        &self,
        exchange: Currency,
        window: TimeWindow,
    ) -> Result<NetworkValueReport, EngineError> {
        let currencies = self.registry.issued_currencies();
        let conversion_pairs: Vec<CurrencyPair> = currencies
            .iter()
            .cloned()
            .map(|currency| CurrencyPair {
                base: Currency::Native,
                counter: currency,
            })
            .collect();

        let balances = self
            .capitalization
            .balances(currencies, window.start(), window.end())
            .await?;
        let statistics = fanout::fetch_all(
            self.market_data.as_ref(),
            &conversion_pairs,
            &window,
            QueryMode::Aggregate,
        )
        .await?;
        let exchange_rate = self.exchange_rate_for(&statistics, &exchange, &window).await?;
        let native_supply = self.ledger.total_native_supply().await?;

        let mut total = 0.0;
        let mut components = Vec::with_capacity(balances.len() + 1);
        // Balances and statistics share the registry enumeration order.
        for (balance, statistic) in balances.into_iter().zip(&statistics) {
            let native_rate = statistic.rate;
            let (rate, converted_amount) = if native_rate != 0.0 {
                (
                    exchange_rate / native_rate,
                    balance.amount / native_rate * exchange_rate,
                )
            } else {
                (0.0, 0.0)
            };
            total += converted_amount;
            components.push(ValueComponent {
                currency: balance.currency,
                amount: balance.amount,
                rate,
                converted_amount,
            });
        }

        // The native supply is already in native terms: raw rate 1.
        let converted_supply = native_supply * exchange_rate;
        total += converted_supply;
        components.push(ValueComponent {
            currency: Currency::Native,
            amount: native_supply,
            rate: exchange_rate,
            converted_amount: converted_supply,
        });

        Ok(NetworkValueReport {
            time: window.end_rfc3339(),
            exchange,
            exchange_rate,
            total,
            components,
        })
    }

    /// Resolves the native-to-target rate, running at most one extra
    /// conversion query when the statistics in hand cannot answer it.
    async fn exchange_rate_for(
        &self,
        statistics: &[MarketStatistic],
        target: &Currency,
        window: &TimeWindow,
    ) -> Result<f64, EngineError> {
        match resolve_exchange_rate(statistics, target) {
            RateResolution::Resolved(rate) => Ok(rate),
            RateResolution::NeedsConversion(pair) => {
                debug!(%pair, "running conversion query for the exchange rate");
                let query = StatsQuery {
                    pair,
                    start: window.start(),
                    end: window.end(),
                    mode: QueryMode::Aggregate,
                };
                match self.market_data.trade_stats(query).await? {
                    Some(aggregate) if aggregate.vwap != 0.0 => Ok(aggregate.vwap),
                    _ => Err(EngineError::NoExchangeRate),
                }
            }
        }
    }

    fn exchange_currency(&self, raw: Option<&RawCurrency>) -> Result<Currency, ValidationError> {
        match raw {
            None => Ok(Currency::Native),
            Some(raw) => Currency::parse(raw, &self.registry),
        }
    }
}
