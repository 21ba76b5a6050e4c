use ledgerfx_core::{ExchangeRatesRequest, ReportEngine};
use serde_json::Value;

use crate::cli::RequestArgs;
use crate::error::CliError;

pub async fn run(engine: &ReportEngine, args: &RequestArgs) -> Result<Value, CliError> {
    let request: ExchangeRatesRequest = super::parse_request(args)?;
    let rates = engine.exchange_rates(request).await?;
    Ok(serde_json::to_value(rates)?)
}
