//! Destinations for execution status notifications

use super::EventNotification;
use crate::common::http_client;
use crate::error::{OfflineError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const PUT_EVENTS_TARGET: &str = "AWSEvents.PutEvents";
const AMZ_JSON_1_1: &str = "application/x-amz-json-1.1";

/// Something that accepts execution status notifications
///
/// Delivery is best-effort. Callers log a failed publish and carry on.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Deliver one notification
    async fn publish(&self, notification: &EventNotification) -> Result<()>;

    /// Short name used in log messages
    fn name(&self) -> &'static str;
}

/// Publishes notifications to an EventBridge-compatible `PutEvents` endpoint
#[derive(Debug, Clone)]
pub struct EventBridgeSink {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct PutEventsRequest<'a> {
    entries: Vec<PutEventsEntry<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct PutEventsEntry<'a> {
    source: &'a str,
    detail_type: &'a str,
    detail: String,
    resources: &'a [String],
    time: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    event_bus_name: Option<&'a str>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
struct PutEventsResponse {
    #[serde(default)]
    failed_entry_count: u64,
    #[serde(default)]
    entries: Vec<PutEventsResultEntry>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PutEventsResultEntry {
    error_code: Option<String>,
    error_message: Option<String>,
}

impl EventBridgeSink {
    /// Create a sink posting to `endpoint`, giving up on a request after `timeout`
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self::with_client(http_client(timeout)?, endpoint))
    }

    /// Create a sink with a preconfigured HTTP client
    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    /// Endpoint notifications are posted to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn request_body(notification: &EventNotification) -> Result<PutEventsRequest<'_>> {
        Ok(PutEventsRequest {
            entries: vec![PutEventsEntry {
                source: &notification.source,
                detail_type: &notification.detail_type,
                detail: serde_json::to_string(&notification.detail)?,
                resources: &notification.resources,
                time: notification.time.timestamp(),
                event_bus_name: notification.event_bus_name.as_deref(),
            }],
        })
    }

    fn delivery_error(&self, reason: impl Into<String>) -> OfflineError {
        OfflineError::EventDelivery {
            sink: self.name(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl EventSink for EventBridgeSink {
    async fn publish(&self, notification: &EventNotification) -> Result<()> {
        let body = serde_json::to_vec(&Self::request_body(notification)?)?;

        let response = self
            .client
            .post(&self.endpoint)
            .header("X-Amz-Target", PUT_EVENTS_TARGET)
            .header(reqwest::header::CONTENT_TYPE, AMZ_JSON_1_1)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(self.delivery_error(format!("HTTP {status}: {text}")));
        }

        let result: PutEventsResponse = if text.trim().is_empty() {
            PutEventsResponse::default()
        } else {
            serde_json::from_str(&text)?
        };

        if result.failed_entry_count > 0 {
            let reason = result
                .entries
                .iter()
                .find_map(|entry| match (&entry.error_code, &entry.error_message) {
                    (Some(code), Some(message)) => Some(format!("{code}: {message}")),
                    (Some(code), None) => Some(code.clone()),
                    (None, Some(message)) => Some(message.clone()),
                    (None, None) => None,
                })
                .unwrap_or_else(|| format!("{} entries failed", result.failed_entry_count));
            return Err(self.delivery_error(reason));
        }

        tracing::debug!(
            "Published {} for {}",
            notification.detail.status,
            notification.detail.execution_arn
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "eventbridge"
    }
}

/// Keeps every notification in memory
///
/// Clones share the same buffer, so a clone handed to a forwarder can be
/// inspected from the outside.
#[derive(Debug, Clone, Default)]
pub struct MemoryEventSink {
    events: Arc<Mutex<Vec<EventNotification>>>,
}

impl MemoryEventSink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the notifications received so far
    pub fn events(&self) -> Vec<EventNotification> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Number of notifications received so far
    pub fn len(&self) -> usize {
        self.events().len()
    }

    /// Whether nothing was received yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl EventSink for MemoryEventSink {
    async fn publish(&self, notification: &EventNotification) -> Result<()> {
        self.events
            .lock()
            .map_err(|_| OfflineError::EventDelivery {
                sink: self.name(),
                reason: "event buffer lock poisoned".to_string(),
            })?
            .push(notification.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Writes notifications to the log and nowhere else
#[derive(Debug, Clone, Copy, Default)]
pub struct LogEventSink;

#[async_trait]
impl EventSink for LogEventSink {
    async fn publish(&self, notification: &EventNotification) -> Result<()> {
        tracing::info!(
            execution_arn = %notification.detail.execution_arn,
            status = %notification.detail.status,
            "{}",
            notification.detail_type
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{ExecutionEvent, ExecutionStatus};
    use crate::test_support::{SilentServer, StubServer};
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn notification() -> EventNotification {
        let time = Utc.with_ymd_and_hms(2023, 1, 1, 10, 0, 0).unwrap();
        EventNotification::execution_status_change(ExecutionEvent {
            execution_arn: "arn:aws:states:us-east-1:101010101010:execution:MyMachine:exec1"
                .to_string(),
            state_machine_arn: "arn:aws:states:us-east-1:101010101010:stateMachine:MyMachine"
                .to_string(),
            name: "exec1".to_string(),
            status: ExecutionStatus::Succeeded,
            start_date: None,
            stop_date: Some(time),
            time,
        })
    }

    #[test]
    fn test_put_events_body() {
        let notification = notification().with_event_bus_name(Some("local".to_string()));
        let body = serde_json::to_value(EventBridgeSink::request_body(&notification).unwrap())
            .unwrap();

        let entry = &body["Entries"][0];
        assert_eq!(entry["Source"], "aws.states");
        assert_eq!(entry["DetailType"], "Step Functions Execution Status Change");
        assert_eq!(entry["Time"], 1672567200);
        assert_eq!(entry["EventBusName"], "local");
        assert_eq!(
            entry["Resources"],
            json!(["arn:aws:states:us-east-1:101010101010:execution:MyMachine:exec1"])
        );

        let detail: serde_json::Value =
            serde_json::from_str(entry["Detail"].as_str().unwrap()).unwrap();
        assert_eq!(detail["status"], "SUCCEEDED");
        assert_eq!(detail["startDate"], serde_json::Value::Null);
        assert_eq!(detail["stopDate"], 1672567200000i64);
    }

    #[test]
    fn test_put_events_body_omits_default_bus() {
        let notification = notification();
        let body = serde_json::to_value(EventBridgeSink::request_body(&notification).unwrap())
            .unwrap();
        assert!(body["Entries"][0].get("EventBusName").is_none());
    }

    #[tokio::test]
    async fn test_memory_sink_clones_share_buffer() {
        let sink = MemoryEventSink::new();
        let handle = sink.clone();

        sink.publish(&notification()).await.unwrap();
        sink.publish(&notification()).await.unwrap();

        assert_eq!(handle.len(), 2);
        assert_eq!(handle.events()[0].detail.name, "exec1");
    }

    #[tokio::test]
    async fn test_log_sink_accepts_everything() {
        assert!(LogEventSink.publish(&notification()).await.is_ok());
    }

    #[tokio::test]
    async fn test_event_bridge_sink_posts_put_events() {
        let server = StubServer::respond(
            "200 OK",
            r#"{"FailedEntryCount":0,"Entries":[{"EventId":"1"}]}"#,
        )
        .await;
        let sink = EventBridgeSink::new(server.url.clone(), Duration::from_secs(5)).unwrap();

        sink.publish(&notification()).await.unwrap();

        let request = server.request().await.to_lowercase();
        assert!(request.starts_with("post / http/1.1"));
        assert!(request.contains("x-amz-target: awsevents.putevents"));
        assert!(request.contains("content-type: application/x-amz-json-1.1"));
        assert!(request.contains("step functions execution status change"));
    }

    #[tokio::test]
    async fn test_event_bridge_sink_http_error() {
        let server = StubServer::respond("500 Internal Server Error", "{}").await;
        let sink = EventBridgeSink::new(server.url.clone(), Duration::from_secs(5)).unwrap();

        let err = sink.publish(&notification()).await.unwrap_err();
        assert!(err.to_string().contains("HTTP 500"));
    }

    #[tokio::test]
    async fn test_event_bridge_sink_failed_entries() {
        let server = StubServer::respond(
            "200 OK",
            r#"{"FailedEntryCount":1,"Entries":[{"ErrorCode":"InternalFailure","ErrorMessage":"bus unavailable"}]}"#,
        )
        .await;
        let sink = EventBridgeSink::new(server.url.clone(), Duration::from_secs(5)).unwrap();

        let err = sink.publish(&notification()).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to deliver event to eventbridge: InternalFailure: bus unavailable"
        );
    }

    #[tokio::test]
    async fn test_event_bridge_sink_gives_up_on_silent_endpoint() {
        let server = SilentServer::start().await;
        let sink = EventBridgeSink::new(server.url.clone(), Duration::from_millis(200)).unwrap();

        let result = tokio::time::timeout(Duration::from_secs(5), sink.publish(&notification()))
            .await
            .expect("publish should give up on its own");

        assert!(matches!(result, Err(OfflineError::Http(_))));
    }
}
