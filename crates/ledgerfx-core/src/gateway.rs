//! External collaborator interfaces.
//!
//! The engine is a read-side aggregation layer; the queries it depends on
//! (trade aggregation, issuer balances, ledger snapshots) live behind
//! these object-safe async traits and are injected at construction.

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;

use crate::domain::{Currency, CurrencyPair};

/// Boxed future returned by the object-safe gateway traits.
pub type GatewayFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, GatewayError>> + Send + 'a>>;

/// Upstream data-tier failure. Surfaced verbatim to the caller and never
/// retried here; retry policy belongs to the gateway implementation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("market data - {0}")]
    MarketData(String),
    #[error("issuer capitalization - {0}")]
    Capitalization(String),
    #[error("ledger snapshot - {0}")]
    Ledger(String),
}

/// How the trade-aggregation query should reduce the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryMode {
    /// One aggregate bucket covering the whole window.
    Aggregate,
    /// Only the most recent trade in the window, most-recent-first.
    LastTrade,
}

/// Trade-statistics query for one pair over one window.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsQuery {
    pub pair: CurrencyPair,
    pub start: OffsetDateTime,
    pub end: OffsetDateTime,
    pub mode: QueryMode,
}

/// Aggregated trade record for one pair over one window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradeAggregate {
    /// Total traded base-currency volume.
    pub base_volume: f64,
    /// Number of exercised trades.
    pub count: u64,
    /// Price of the most recent trade in the bucket.
    pub close: f64,
    /// Volume-weighted average price of the counter in base units.
    pub vwap: f64,
}

/// The time-bucketed trade-aggregation query.
pub trait MarketDataGateway: Send + Sync {
    /// Fetches trade statistics for one pair. `Ok(None)` means the pair saw
    /// no trades in the window; that is a successful, empty result.
    fn trade_stats(&self, query: StatsQuery) -> GatewayFuture<'_, Option<TradeAggregate>>;
}

/// Outstanding issued balance for one currency as of a window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssuedBalance {
    #[serde(flatten)]
    pub currency: Currency,
    pub amount: f64,
}

/// The issuer-balance query.
pub trait IssuerCapitalizationGateway: Send + Sync {
    /// Per-currency outstanding balances as of the window, returned in the
    /// same order as the input so positional correlation stays valid.
    fn balances(
        &self,
        currencies: Vec<Currency>,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> GatewayFuture<'_, Vec<IssuedBalance>>;
}

/// The ledger-snapshot query.
pub trait LedgerSnapshotGateway: Send + Sync {
    /// Total native-unit supply as of the most recently recorded ledger.
    fn total_native_supply(&self) -> GatewayFuture<'_, f64>;
}
