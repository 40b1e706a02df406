use divtick_core::ProcessOptions;

use crate::cli::ProcessArgs;
use crate::error::CliError;

use super::{failure_errors, CommandResult, Engine};

pub async fn run(args: &ProcessArgs, engine: &Engine) -> Result<CommandResult, CliError> {
    let options = ProcessOptions {
        force: args.force,
        fetch_mode: args.fetch_mode.into(),
    };

    // A single ticker reports its result directly rather than a one-item batch.
    if let [ticker] = args.tickers.as_slice() {
        let result = engine
            .scheduler
            .orchestrator()
            .process_ticker(ticker, options)
            .await;
        let errors = failure_errors(std::slice::from_ref(&result));
        return Ok(CommandResult::ok(serde_json::to_value(&result)?).with_errors(errors));
    }

    let batch = engine
        .scheduler
        .process_batch(args.tickers.as_slice(), options)
        .await;
    let errors = failure_errors(&batch.results);
    Ok(CommandResult::ok(serde_json::to_value(&batch)?).with_errors(errors))
}
