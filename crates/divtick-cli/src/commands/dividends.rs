use divtick_core::domain::parse_date;
use divtick_core::{DividendQuery, Symbol};
use serde_json::json;

use crate::cli::DividendsArgs;
use crate::error::CliError;

use super::{CommandResult, Engine};

pub async fn run(args: &DividendsArgs, engine: &Engine) -> Result<CommandResult, CliError> {
    let query = build_query(args)?;
    let dividends = engine.gateway.get_dividends(&query).await?;

    let data = json!({
        "ticker": query.ticker.as_ref().map(Symbol::as_str),
        "count": dividends.len(),
        "dividends": dividends,
    });
    Ok(CommandResult::ok(data).with_rows(dividends))
}

fn build_query(args: &DividendsArgs) -> Result<DividendQuery, CliError> {
    let ticker = if args.ticker.trim().eq_ignore_ascii_case("all") {
        None
    } else {
        Some(Symbol::parse(&args.ticker)?)
    };

    let query = DividendQuery {
        ticker,
        start_date: args.start_date.as_deref().map(parse_date).transpose()?,
        end_date: args.end_date.as_deref().map(parse_date).transpose()?,
        limit: args.limit,
        offset: args.offset,
    };

    if let (Some(start), Some(end)) = (query.start_date, query.end_date) {
        if start > end {
            return Err(CliError::Command(String::from(
                "--start-date must not be after --end-date",
            )));
        }
    }

    Ok(query)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(ticker: &str, start: Option<&str>, end: Option<&str>) -> DividendsArgs {
        DividendsArgs {
            ticker: ticker.to_owned(),
            start_date: start.map(str::to_owned),
            end_date: end.map(str::to_owned),
            limit: None,
            offset: None,
        }
    }

    #[test]
    fn all_means_every_ticker() {
        let query = build_query(&args("ALL", None, None)).expect("query");
        assert!(query.ticker.is_none());
    }

    #[test]
    fn ticker_is_canonicalized() {
        let query = build_query(&args("ko", Some("2024-01-01"), None)).expect("query");
        assert_eq!(query.ticker.map(String::from).as_deref(), Some("KO"));
        assert!(query.start_date.is_some());
    }

    #[test]
    fn inverted_range_is_rejected() {
        let error = build_query(&args("KO", Some("2024-06-01"), Some("2024-01-01")))
            .expect_err("inverted");
        assert_eq!(error.exit_code(), 2);
    }

    #[test]
    fn malformed_dates_are_validation_errors() {
        let error = build_query(&args("KO", Some("June 1"), None)).expect_err("bad date");
        assert!(matches!(error, CliError::Validation(_)));
    }
}
