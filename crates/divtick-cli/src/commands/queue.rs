use std::fs;
use std::path::Path;

use divtick_core::{Disposition, EnvelopeError, MessageOutcome, QueueConsumer, QueueMessage};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::error::CliError;

use super::{failure_errors, CommandResult, Engine};

#[derive(Debug, Serialize)]
struct ConsumeReport {
    delivered: usize,
    acknowledged: usize,
    dead_lettered: usize,
    outcomes: Vec<MessageOutcome>,
}

pub async fn send(payload: &str, engine: &Engine) -> Result<CommandResult, CliError> {
    let body: Value = serde_json::from_str(payload)?;
    let consumer = QueueConsumer::new(engine.scheduler.clone());
    let batch = consumer.dispatch(&body).await?;

    let errors = failure_errors(&batch.results);
    Ok(CommandResult::ok(serde_json::to_value(&batch)?).with_errors(errors))
}

pub async fn consume(
    file: &Path,
    max_attempts: u32,
    engine: &Engine,
) -> Result<CommandResult, CliError> {
    let messages = read_messages(file)?;
    let consumer = QueueConsumer::new(engine.scheduler.clone());
    let max_attempts = max_attempts.max(1);

    let delivered = messages.len();
    let mut pending = messages;
    let mut settled = Vec::with_capacity(delivered);
    let mut errors = Vec::new();

    // Redeliver retried messages until they are acknowledged or out of attempts.
    while !pending.is_empty() {
        let outcomes = consumer.consume(&pending).await;
        let mut redeliver = Vec::new();

        for (message, outcome) in pending.into_iter().zip(outcomes) {
            match outcome.disposition {
                Disposition::Retry if message.attempts < max_attempts => {
                    redeliver.push(QueueMessage {
                        attempts: message.attempts + 1,
                        ..message
                    });
                }
                Disposition::Retry => {
                    warn!(message_id = %message.id, attempts = message.attempts, "message dead-lettered");
                    errors.push(EnvelopeError::new(
                        "queue_retry_exhausted",
                        format!(
                            "{}: {}",
                            message.id,
                            outcome.error.as_deref().unwrap_or("retry requested")
                        ),
                    ));
                    settled.push(outcome);
                }
                Disposition::Ack => {
                    if let Some(batch) = &outcome.batch {
                        errors.extend(failure_errors(&batch.results));
                    }
                    settled.push(outcome);
                }
            }
        }

        pending = redeliver;
    }

    let acknowledged = settled
        .iter()
        .filter(|outcome| outcome.disposition == Disposition::Ack)
        .count();
    let report = ConsumeReport {
        delivered,
        acknowledged,
        dead_lettered: settled.len() - acknowledged,
        outcomes: settled,
    };

    Ok(CommandResult::ok(serde_json::to_value(&report)?).with_errors(errors))
}

fn read_messages(file: &Path) -> Result<Vec<QueueMessage>, CliError> {
    let content = fs::read_to_string(file)?;
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str::<QueueMessage>(line).map_err(|error| {
                CliError::Command(format!(
                    "{}:{}: not a queue message: {error}",
                    file.display(),
                    index + 1
                ))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn reads_ndjson_messages_skipping_blank_lines() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, r#"{{"id":"m1","body":{{"type":"new_ticker_processing","tickers":["KO"]}}}}"#)
            .expect("write");
        writeln!(file).expect("write");
        writeln!(file, r#"{{"id":"m2","body":"garbage","attempts":2}}"#).expect("write");

        let messages = read_messages(file.path()).expect("messages");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].attempts, 1);
        assert_eq!(messages[1].attempts, 2);
    }

    #[test]
    fn reports_line_numbers_for_bad_lines() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "not json").expect("write");

        let error = read_messages(file.path()).expect_err("bad line");
        assert!(error.to_string().contains(":1:"));
    }
}
