use ledgerfx_core::{NetworkValueRequest, ReportEngine};
use serde_json::Value;

use crate::cli::RequestArgs;
use crate::error::CliError;

pub async fn run(engine: &ReportEngine, args: &RequestArgs) -> Result<Value, CliError> {
    let request: NetworkValueRequest = super::parse_request(args)?;
    let report = engine.total_network_value(request).await?;
    Ok(serde_json::to_value(report)?)
}
