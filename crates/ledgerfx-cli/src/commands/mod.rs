mod markets;
mod rates;
mod value;

use std::fs;
use std::io::Read;
use std::sync::Arc;

use ledgerfx_core::{
    CacheGateway, FixtureMarketData, GatewayRegistry, MemoryCache, ReportEngine, StaticBalances,
    StaticSupply,
};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::cli::{Cli, Command, RequestArgs};
use crate::error::CliError;

/// Native supply reported by the built-in fixture ledger gateway.
const DEMO_NATIVE_SUPPLY: f64 = 100_000_000_000.0;

pub async fn run(cli: &Cli) -> Result<Value, CliError> {
    let engine = build_engine(cli)?;

    match &cli.command {
        Command::Rates(args) => rates::run(&engine, args).await,
        Command::Markets(args) => markets::run(&engine, args).await,
        Command::Value(args) => value::run(&engine, args).await,
    }
}

/// Wires the engine over the fixture gateways and an in-process cache.
fn build_engine(cli: &Cli) -> Result<ReportEngine, CliError> {
    let registry = match &cli.registry {
        Some(path) => GatewayRegistry::from_json(&fs::read_to_string(path)?)?,
        None => GatewayRegistry::demo(),
    };

    Ok(ReportEngine::new(
        Arc::new(FixtureMarketData),
        Arc::new(StaticBalances::default()),
        Arc::new(StaticSupply(DEMO_NATIVE_SUPPLY)),
        registry,
        CacheGateway::new(Arc::new(MemoryCache::new())),
    ))
}

/// Reads the request body from the argument or stdin; an empty body
/// means an all-defaults request.
fn parse_request<T: DeserializeOwned>(args: &RequestArgs) -> Result<T, CliError> {
    let payload = match &args.request {
        Some(inline) => inline.clone(),
        None => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };

    let body = payload.trim();
    let body = if body.is_empty() { "{}" } else { body };
    Ok(serde_json::from_str(body)?)
}
