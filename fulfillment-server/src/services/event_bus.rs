//! Domain Event Bus
//!
//! In-process fan-out of [`DomainEvent`]s over a `tokio::sync::broadcast`
//! channel. Emission is fire-and-forget: no subscriber, or a lagging one,
//! never fails the request that produced the event.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use shared::{DomainEvent, EventEnvelope};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Events buffered per subscriber before it starts lagging
const DEFAULT_CAPACITY: usize = 1024;

#[derive(Clone, Debug)]
pub struct EventBus {
    sender: broadcast::Sender<EventEnvelope>,
    seq: Arc<AtomicU64>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            seq: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Publish an event on behalf of `actor_id`, returns its sequence number
    pub fn emit(&self, actor_id: i64, event: DomainEvent) -> u64 {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        let name = event.name();
        let envelope = EventEnvelope {
            seq,
            actor_id,
            timestamp: shared::util::now_millis(),
            event,
        };

        match self.sender.send(envelope) {
            Ok(receivers) => tracing::debug!(seq, event = name, receivers, "Event emitted"),
            // 没有订阅者不是错误
            Err(_) => tracing::trace!(seq, event = name, "Event emitted without subscribers"),
        }
        seq
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.sender.subscribe()
    }

    /// Log every event under the `events` target until the bus is dropped
    pub fn spawn_logger(&self) -> JoinHandle<()> {
        let mut rx = self.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(envelope) => tracing::info!(
                        target: "events",
                        seq = envelope.seq,
                        actor_id = envelope.actor_id,
                        event = envelope.event.name(),
                        payload = ?envelope.event,
                        "Domain event"
                    ),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(target: "events", skipped, "Event logger lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
