use divtick_core::ProcessOptions;
use tracing::info;

use crate::cli::RefreshArgs;
use crate::error::CliError;

use super::{failure_errors, CommandResult, Engine};

pub async fn run(args: &RefreshArgs, engine: &Engine) -> Result<CommandResult, CliError> {
    let tickers: Vec<String> = engine
        .gateway
        .list_active_tickers()
        .await?
        .into_iter()
        .map(|ticker| String::from(ticker.symbol))
        .collect();
    info!(count = tickers.len(), "refreshing active tickers");

    let options = ProcessOptions {
        force: false,
        fetch_mode: args.fetch_mode.into(),
    };
    let batch = engine
        .scheduler
        .process_batch(tickers.as_slice(), options)
        .await;

    let errors = failure_errors(&batch.results);
    Ok(CommandResult::ok(serde_json::to_value(&batch)?).with_errors(errors))
}
