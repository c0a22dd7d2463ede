//! Log line classification
//!
//! Step Functions Local prints one line per history event:
//!
//! ```text
//! 2023-01-01 10:00:00.000 : arn:aws:states:us-east-1:101010101010:execution:MyMachine:exec1 : {"Type":"ExecutionStarted",...}
//! ```
//!
//! Everything the emulator prints that does not have this shape, or that
//! describes anything other than an execution-level transition, is noise.

use super::{ExecutionEvent, ExecutionStatus};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;

const LOG_LINE_PATTERN: &str = r"(\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}\.\d{3}) : (arn:aws:states:[^:\s]+:[^:\s]+:execution:[^:\s]+:[^:\s]+) : (\{.*\})";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

#[derive(Debug, Deserialize)]
struct HistoryEvent {
    #[serde(rename = "Type")]
    event_type: String,
}

/// Parses emulator log lines into execution events
#[derive(Debug, Clone)]
pub struct LogLineTranslator {
    pattern: Regex,
}

impl LogLineTranslator {
    /// Create a translator with the emulator log line pattern compiled
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(LOG_LINE_PATTERN).expect("log line pattern is a valid regex"),
        }
    }

    /// Classify one line of emulator output
    ///
    /// Returns `Some` only for well-formed lines whose payload `Type` is an
    /// execution-level transition. Malformed timestamps, ARNs or JSON yield
    /// `None`; this never fails.
    pub fn translate(&self, line: &str) -> Option<ExecutionEvent> {
        let captures = self.pattern.captures(line)?;
        let time = parse_timestamp(captures.get(1)?.as_str())?;
        let execution_arn = captures.get(2)?.as_str();
        let payload: HistoryEvent = serde_json::from_str(captures.get(3)?.as_str()).ok()?;
        let status = ExecutionStatus::from_history_type(&payload.event_type)?;

        let (state_machine_arn, name) = split_execution_arn(execution_arn)?;
        let (start_date, stop_date) = if status.is_terminal() {
            (None, Some(time))
        } else {
            (Some(time), None)
        };

        Some(ExecutionEvent {
            execution_arn: execution_arn.to_string(),
            state_machine_arn,
            name,
            status,
            start_date,
            stop_date,
            time,
        })
    }
}

impl Default for LogLineTranslator {
    fn default() -> Self {
        Self::new()
    }
}

/// Classify one line with a shared translator
pub fn translate(line: &str) -> Option<ExecutionEvent> {
    static TRANSLATOR: OnceLock<LogLineTranslator> = OnceLock::new();
    TRANSLATOR.get_or_init(LogLineTranslator::new).translate(line)
}

/// Emulator timestamps carry no zone; they are in the emulator host's local time
fn parse_timestamp(timestamp: &str) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT).ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
}

/// `arn:aws:states:<region>:<account>:execution:<machine>:<name>` into the
/// state machine ARN and the execution name
fn split_execution_arn(execution_arn: &str) -> Option<(String, String)> {
    let segments: Vec<&str> = execution_arn.split(':').collect();
    if segments.len() != 8 || segments[5] != "execution" {
        return None;
    }

    let state_machine_arn = [&segments[..5], &["stateMachine"], &segments[6..7]]
        .concat()
        .join(":");
    Some((state_machine_arn, segments[7].to_string()))
}
