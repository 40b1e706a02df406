use std::io::{self, Write};

use divtick_core::{DividendRecord, Envelope};
use serde_json::Value;

use crate::cli::OutputFormat;
use crate::error::CliError;

pub const CSV_HEADER: [&str; 9] = [
    "Ticker",
    "Declaration Date",
    "Record Date",
    "Ex-Dividend Date",
    "Pay Date",
    "Amount",
    "Currency",
    "Frequency",
    "Type",
];

pub fn render(
    envelope: &Envelope<Value>,
    rows: Option<&[DividendRecord]>,
    format: OutputFormat,
    pretty: bool,
) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => {
            let payload = if pretty {
                serde_json::to_string_pretty(envelope)?
            } else {
                serde_json::to_string(envelope)?
            };
            println!("{payload}");
        }
        OutputFormat::Csv => {
            let rows = rows.ok_or_else(|| {
                CliError::Command(String::from(
                    "--format csv is only supported by the dividends command",
                ))
            })?;
            let stdout = io::stdout();
            write_csv(stdout.lock(), rows)?;
        }
    }

    Ok(())
}

pub fn write_csv<W: Write>(writer: W, rows: &[DividendRecord]) -> Result<(), CliError> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(CSV_HEADER)?;

    for row in rows {
        let amount = row.amount.to_string();
        let frequency = row.frequency.to_string();
        csv.write_record([
            row.ticker.as_str(),
            row.declaration_date.as_deref().unwrap_or(""),
            row.record_date.as_deref().unwrap_or(""),
            row.ex_dividend_date.as_str(),
            row.pay_date.as_deref().unwrap_or(""),
            amount.as_str(),
            row.currency.as_str(),
            frequency.as_str(),
            row.dividend_type.as_str(),
        ])?;
    }

    csv.flush()?;
    Ok(())
}
