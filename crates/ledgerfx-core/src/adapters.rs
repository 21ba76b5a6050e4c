//! Deterministic in-memory gateway implementations.
//!
//! `StaticMarketData` is scriptable per pair and records every query it
//! receives, which makes call-count and ordering assertions cheap in
//! tests. `FixtureMarketData` produces seeded synthetic data for demos
//! and the CLI default wiring.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use time::OffsetDateTime;

use crate::domain::{Currency, CurrencyPair};
use crate::gateway::{
    GatewayError, GatewayFuture, IssuedBalance, IssuerCapitalizationGateway,
    LedgerSnapshotGateway, MarketDataGateway, StatsQuery, TradeAggregate,
};

/// Scriptable market-data gateway keyed by pair.
#[derive(Debug, Clone, Default)]
pub struct StaticMarketData {
    stats: HashMap<String, TradeAggregate>,
    delays: HashMap<String, Duration>,
    failure: Option<String>,
    queries: Arc<Mutex<Vec<String>>>,
}

impl StaticMarketData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gateway whose every query fails with the given message.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn with_stat(mut self, pair: &CurrencyPair, aggregate: TradeAggregate) -> Self {
        self.stats.insert(pair.to_string(), aggregate);
        self
    }

    /// Delays responses for one pair, for completion-order tests.
    pub fn with_delay(mut self, pair: &CurrencyPair, delay: Duration) -> Self {
        self.delays.insert(pair.to_string(), delay);
        self
    }

    /// Every query received so far, in arrival order, as `BASE/COUNTER`.
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().expect("query recorder lock").clone()
    }
}

impl MarketDataGateway for StaticMarketData {
    fn trade_stats(&self, query: StatsQuery) -> GatewayFuture<'_, Option<TradeAggregate>> {
        let key = query.pair.to_string();
        self.queries
            .lock()
            .expect("query recorder lock")
            .push(key.clone());

        let delay = self.delays.get(&key).copied();
        let failure = self.failure.clone();
        let result = self.stats.get(&key).copied();

        Box::pin(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            match failure {
                Some(message) => Err(GatewayError::MarketData(message)),
                None => Ok(result),
            }
        })
    }
}

/// Deterministic synthetic market data, seeded per pair.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureMarketData;

impl MarketDataGateway for FixtureMarketData {
    fn trade_stats(&self, query: StatsQuery) -> GatewayFuture<'_, Option<TradeAggregate>> {
        let seed = pair_seed(&query.pair);
        let vwap = 0.5 + f64::from(seed % 997) / 100.0;
        let aggregate = TradeAggregate {
            base_volume: f64::from(seed % 503) * 10.0 + 25.0,
            count: u64::from(seed % 89) + 1,
            close: vwap * 1.01,
            vwap,
        };
        Box::pin(async move { Ok(Some(aggregate)) })
    }
}

fn pair_seed(pair: &CurrencyPair) -> u32 {
    pair.to_string()
        .bytes()
        .fold(17_u32, |acc, byte| acc.wrapping_mul(31).wrapping_add(u32::from(byte)))
}

/// Issuer-capitalization gateway with per-currency amounts and a default.
#[derive(Debug, Clone)]
pub struct StaticBalances {
    amounts: HashMap<String, f64>,
    default_amount: f64,
}

impl StaticBalances {
    pub fn new(default_amount: f64) -> Self {
        Self {
            amounts: HashMap::new(),
            default_amount,
        }
    }

    pub fn with_amount(mut self, currency: &Currency, amount: f64) -> Self {
        self.amounts.insert(currency.to_string(), amount);
        self
    }
}

impl Default for StaticBalances {
    fn default() -> Self {
        Self::new(250_000.0)
    }
}

impl IssuerCapitalizationGateway for StaticBalances {
    fn balances(
        &self,
        currencies: Vec<Currency>,
        _start: OffsetDateTime,
        _end: OffsetDateTime,
    ) -> GatewayFuture<'_, Vec<IssuedBalance>> {
        let balances = currencies
            .into_iter()
            .map(|currency| {
                let amount = self
                    .amounts
                    .get(&currency.to_string())
                    .copied()
                    .unwrap_or(self.default_amount);
                IssuedBalance { currency, amount }
            })
            .collect();
        Box::pin(async move { Ok(balances) })
    }
}

/// Ledger-snapshot gateway with a fixed total native supply.
#[derive(Debug, Clone, Copy)]
pub struct StaticSupply(pub f64);

impl LedgerSnapshotGateway for StaticSupply {
    fn total_native_supply(&self) -> GatewayFuture<'_, f64> {
        let supply = self.0;
        Box::pin(async move { Ok(supply) })
    }
}
