use crate::error::{CliResult, IntoCliResult};
use std::io::Write;
use std::path::Path;
use stepfunctions_offline::events::LogLineTranslator;
use stepfunctions_offline::EventNotification;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

/// Translate captured emulator output from `file`, or stdin, onto stdout
///
/// Returns the number of events printed.
pub async fn run_translate_command(file: Option<&Path>) -> CliResult<usize> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match file {
        Some(path) => {
            let file = tokio::fs::File::open(path).await.cli_validation_error()?;
            translate_lines(BufReader::new(file), &mut out).await
        }
        None => translate_lines(BufReader::new(tokio::io::stdin()), &mut out).await,
    }
}

/// Write one JSON notification per execution status line of `reader`
pub async fn translate_lines<R, W>(reader: R, out: &mut W) -> CliResult<usize>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let translator = LogLineTranslator::new();
    let mut lines = reader.lines();
    let mut count = 0;

    while let Some(line) = lines.next_line().await.cli_general_error()? {
        let Some(event) = translator.translate(&line) else {
            continue;
        };

        let notification = EventNotification::execution_status_change(event);
        let json = serde_json::to_string(&notification).cli_general_error()?;
        writeln!(out, "{json}").cli_general_error()?;
        count += 1;
    }

    tracing::debug!("Translated {} execution events", count);
    Ok(count)
}
