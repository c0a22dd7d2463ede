//! Pumps emulator output through the translator into a sink
//!
//! Reading and publishing run on separate tasks joined by a bounded queue.
//! When the queue is full new events are dropped with a warning and reading
//! carries on.

use super::{EventNotification, EventSink, LogLineTranslator};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

/// Tracing target emulator output is echoed under
pub const EMULATOR_LOG_TARGET: &str = "stepfunctions_local";

/// Events waiting for delivery before new ones are dropped
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// How long queued events may take to drain once the output closes
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Reads emulator log lines and publishes the execution events they describe
#[derive(Clone)]
pub struct EventForwarder {
    translator: LogLineTranslator,
    sink: Option<Arc<dyn EventSink>>,
    event_bus_name: Option<String>,
    queue_capacity: usize,
    drain_timeout: Duration,
}

impl std::fmt::Debug for EventForwarder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventForwarder")
            .field("sink", &self.sink.as_ref().map(|sink| sink.name()))
            .field("event_bus_name", &self.event_bus_name)
            .field("queue_capacity", &self.queue_capacity)
            .field("drain_timeout", &self.drain_timeout)
            .finish()
    }
}

impl EventForwarder {
    /// Forward events to `sink`
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self {
            translator: LogLineTranslator::new(),
            sink: Some(sink),
            event_bus_name: None,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        }
    }

    /// Echo emulator output without publishing anything
    pub fn disabled() -> Self {
        Self {
            translator: LogLineTranslator::new(),
            sink: None,
            event_bus_name: None,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        }
    }

    /// Address notifications to a named event bus
    pub fn with_event_bus_name(mut self, event_bus_name: Option<String>) -> Self {
        self.event_bus_name = event_bus_name;
        self
    }

    /// Number of events that may wait for delivery, at least one
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    /// How long [`run`](Self::run) waits for queued events after the output closes
    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    /// Whether a sink is attached
    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    /// Echo one line of emulator output and build its notification, if any
    pub fn notification_for(&self, line: &str) -> Option<EventNotification> {
        tracing::info!(target: EMULATOR_LOG_TARGET, "{}", line);

        if self.sink.is_none() {
            return None;
        }
        let event = self.translator.translate(line)?;
        Some(
            EventNotification::execution_status_change(event)
                .with_event_bus_name(self.event_bus_name.clone()),
        )
    }

    /// Consume `reader` until it closes
    ///
    /// Returns the number of events delivered. A read error ends the stream
    /// the same way end-of-file does. Events still queued when the drain
    /// timeout runs out are abandoned.
    pub async fn run<R>(&self, reader: R) -> usize
    where
        R: AsyncBufRead + Unpin,
    {
        let delivered = Arc::new(AtomicUsize::new(0));
        let publisher = self
            .sink
            .clone()
            .map(|sink| Publisher::spawn(sink, self.queue_capacity, delivered.clone()));

        let mut lines = reader.lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if let (Some(publisher), Some(notification)) =
                        (publisher.as_ref(), self.notification_for(&line))
                    {
                        publisher.enqueue(notification);
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!("Stopped reading emulator output: {}", e);
                    break;
                }
            }
        }

        if let Some(publisher) = publisher {
            publisher.drain(self.drain_timeout).await;
        }

        let delivered = delivered.load(Ordering::SeqCst);
        tracing::debug!("Emulator output closed after {} events", delivered);
        delivered
    }
}

/// Background task delivering queued notifications in order
struct Publisher {
    queue: mpsc::Sender<EventNotification>,
    task: JoinHandle<()>,
}

impl Publisher {
    fn spawn(sink: Arc<dyn EventSink>, capacity: usize, delivered: Arc<AtomicUsize>) -> Self {
        let (queue, mut pending) = mpsc::channel::<EventNotification>(capacity);

        let task = tokio::spawn(async move {
            while let Some(notification) = pending.recv().await {
                match sink.publish(&notification).await {
                    Ok(()) => {
                        delivered.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(e) => tracing::warn!(
                        "Failed to publish {} event for {} to {}: {}",
                        notification.detail.status,
                        notification.detail.execution_arn,
                        sink.name(),
                        e
                    ),
                }
            }
        });

        Self { queue, task }
    }

    fn enqueue(&self, notification: EventNotification) {
        match self.queue.try_send(notification) {
            Ok(()) => {}
            Err(TrySendError::Full(notification)) => tracing::warn!(
                "Event queue full, dropping {} event for {}",
                notification.detail.status,
                notification.detail.execution_arn
            ),
            Err(TrySendError::Closed(_)) => {}
        }
    }

    async fn drain(self, timeout: Duration) {
        let Self { queue, mut task } = self;
        drop(queue);

        match tokio::time::timeout(timeout, &mut task).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!("Event publisher ended abnormally: {}", e),
            Err(_) => {
                tracing::warn!(
                    "Abandoning undelivered execution events after waiting {:?}",
                    timeout
                );
                task.abort();
            }
        }
    }
}
