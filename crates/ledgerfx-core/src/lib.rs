//! Core engine for ledgerfx.
//!
//! This crate contains:
//! - Canonical currency/pair domain models and validation
//! - Time-window resolution (live vs historical)
//! - External gateway traits and in-memory fixtures
//! - Bounded-concurrency fan-out and rate-graph normalization
//! - Cache-aside layer and the three report assemblers

pub mod adapters;
pub mod cache;
pub mod domain;
pub mod error;
pub mod fanout;
pub mod gateway;
pub mod normalize;
pub mod registry;
pub mod reports;

pub use adapters::{FixtureMarketData, StaticBalances, StaticMarketData, StaticSupply};
pub use cache::{
    CacheBackend, CacheError, CacheFuture, CacheGateway, CacheKey, MemoryCache, ReportKind,
    TtlClass,
};
pub use domain::{
    Currency, CurrencyPair, NamedRange, RawCurrency, RawCurrencyPair, TimeWindow, NATIVE_CODE,
};
pub use error::{EngineError, ValidationError};
pub use fanout::{MarketStatistic, MAX_IN_FLIGHT, MAX_PAIRS};
pub use gateway::{
    GatewayError, GatewayFuture, IssuedBalance, IssuerCapitalizationGateway,
    LedgerSnapshotGateway, MarketDataGateway, QueryMode, StatsQuery, TradeAggregate,
};
pub use normalize::{resolve_exchange_rate, RateResolution};
pub use registry::{Gateway, GatewayAccount, GatewayRegistry};
pub use reports::{
    ExchangeRatesRequest, MarketComponent, NetworkValueReport, NetworkValueRequest, PairRate,
    ReportEngine, TopMarketsReport, TopMarketsRequest, ValueComponent,
};
