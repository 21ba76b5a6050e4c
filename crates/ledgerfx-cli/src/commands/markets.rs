use ledgerfx_core::{ReportEngine, TopMarketsRequest};
use serde_json::Value;

use crate::cli::RequestArgs;
use crate::error::CliError;

pub async fn run(engine: &ReportEngine, args: &RequestArgs) -> Result<Value, CliError> {
    let request: TopMarketsRequest = super::parse_request(args)?;
    let report = engine.top_markets(request).await?;
    Ok(serde_json::to_value(report)?)
}
