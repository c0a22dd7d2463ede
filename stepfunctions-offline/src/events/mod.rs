//! Execution lifecycle events reconstructed from emulator output
//!
//! Step Functions Local reports execution history on its standard output
//! rather than through an event bus. This module turns those log lines back
//! into the `Step Functions Execution Status Change` events the real service
//! publishes, and delivers them to an [`EventSink`].

mod forwarder;
mod sink;
mod translator;

pub use forwarder::{EventForwarder, EMULATOR_LOG_TARGET};
pub use sink::{EventBridgeSink, EventSink, LogEventSink, MemoryEventSink};
pub use translator::{translate, LogLineTranslator};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Source tag of execution status notifications
pub const EVENT_SOURCE: &str = "aws.states";

/// Detail-type label of execution status notifications
pub const EXECUTION_STATUS_CHANGE: &str = "Step Functions Execution Status Change";

/// Status of an execution as reported in a status change event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    /// Execution has started
    Running,
    /// Execution finished successfully
    Succeeded,
    /// Execution failed
    Failed,
    /// Execution exceeded its timeout
    TimedOut,
    /// Execution was stopped
    Aborted,
}

impl ExecutionStatus {
    /// Map an execution history event type to a status
    ///
    /// Only the five execution-level history events produce a status; task
    /// and state events return `None`.
    pub fn from_history_type(event_type: &str) -> Option<Self> {
        match event_type {
            "ExecutionStarted" => Some(ExecutionStatus::Running),
            "ExecutionSucceeded" => Some(ExecutionStatus::Succeeded),
            "ExecutionFailed" => Some(ExecutionStatus::Failed),
            "ExecutionTimedOut" => Some(ExecutionStatus::TimedOut),
            "ExecutionAborted" => Some(ExecutionStatus::Aborted),
            _ => None,
        }
    }

    /// Get the string representation used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Running => "RUNNING",
            ExecutionStatus::Succeeded => "SUCCEEDED",
            ExecutionStatus::Failed => "FAILED",
            ExecutionStatus::TimedOut => "TIMED_OUT",
            ExecutionStatus::Aborted => "ABORTED",
        }
    }

    /// Whether the execution has stopped
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ExecutionStatus::Running)
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One execution status transition
///
/// Serializes to the `detail` payload of the notification. Dates are epoch
/// milliseconds, matching what the real service emits.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionEvent {
    /// ARN of the execution
    pub execution_arn: String,
    /// ARN of the state machine the execution belongs to
    pub state_machine_arn: String,
    /// Execution name
    pub name: String,
    /// New status
    pub status: ExecutionStatus,
    /// When the execution started, for `RUNNING` events
    #[serde(with = "chrono::serde::ts_milliseconds_option")]
    pub start_date: Option<DateTime<Utc>>,
    /// When the execution stopped, for terminal events
    #[serde(with = "chrono::serde::ts_milliseconds_option")]
    pub stop_date: Option<DateTime<Utc>>,
    /// Time of the log line the event was derived from
    #[serde(skip)]
    pub time: DateTime<Utc>,
}

/// A delivery-ready execution status notification
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventNotification {
    /// Originating service
    pub source: String,
    /// Kind of notification
    pub detail_type: String,
    /// Event payload
    pub detail: ExecutionEvent,
    /// Resources the event concerns
    pub resources: Vec<String>,
    /// Event time
    pub time: DateTime<Utc>,
    /// Target bus, when not the default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_bus_name: Option<String>,
}

impl EventNotification {
    /// Wrap an execution event as a status change notification
    pub fn execution_status_change(event: ExecutionEvent) -> Self {
        Self {
            source: EVENT_SOURCE.to_string(),
            detail_type: EXECUTION_STATUS_CHANGE.to_string(),
            resources: vec![event.execution_arn.clone()],
            time: event.time,
            detail: event,
            event_bus_name: None,
        }
    }

    /// Address the notification to a specific bus
    pub fn with_event_bus_name(mut self, event_bus_name: Option<String>) -> Self {
        self.event_bus_name = event_bus_name;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn event(status: ExecutionStatus) -> ExecutionEvent {
        let time = Utc.with_ymd_and_hms(2023, 1, 1, 10, 0, 0).unwrap();
        ExecutionEvent {
            execution_arn: "arn:aws:states:us-east-1:101010101010:execution:MyMachine:exec1"
                .to_string(),
            state_machine_arn: "arn:aws:states:us-east-1:101010101010:stateMachine:MyMachine"
                .to_string(),
            name: "exec1".to_string(),
            status,
            start_date: (!status.is_terminal()).then_some(time),
            stop_date: status.is_terminal().then_some(time),
            time,
        }
    }

    #[test]
    fn test_status_from_history_type() {
        assert_eq!(
            ExecutionStatus::from_history_type("ExecutionTimedOut"),
            Some(ExecutionStatus::TimedOut)
        );
        assert_eq!(ExecutionStatus::from_history_type("executionStarted"), None);
        assert_eq!(ExecutionStatus::from_history_type("TaskStateEntered"), None);
    }

    #[test]
    fn test_event_detail_serialization() {
        let detail = serde_json::to_value(event(ExecutionStatus::Running)).unwrap();

        assert_eq!(
            detail,
            json!({
                "executionArn": "arn:aws:states:us-east-1:101010101010:execution:MyMachine:exec1",
                "stateMachineArn": "arn:aws:states:us-east-1:101010101010:stateMachine:MyMachine",
                "name": "exec1",
                "status": "RUNNING",
                "startDate": 1672567200000i64,
                "stopDate": null
            })
        );
    }

    #[test]
    fn test_notification_envelope() {
        let notification = EventNotification::execution_status_change(event(
            ExecutionStatus::Aborted,
        ))
        .with_event_bus_name(Some("local-bus".to_string()));

        assert_eq!(notification.source, "aws.states");
        assert_eq!(
            notification.detail_type,
            "Step Functions Execution Status Change"
        );
        assert_eq!(
            notification.resources,
            vec!["arn:aws:states:us-east-1:101010101010:execution:MyMachine:exec1"]
        );
        assert_eq!(notification.time, notification.detail.time);
        assert_eq!(notification.event_bus_name.as_deref(), Some("local-bus"));
    }
}
