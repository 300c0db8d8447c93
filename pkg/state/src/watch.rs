use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::sync::broadcast;

/// Type of event in the watch stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    Put,
    Delete,
}

/// A single watch event representing a state change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchEvent {
    pub seq: u64,
    pub event_type: EventType,
    pub key: String,
}

impl WatchEvent {
    /// True for mutations under the given registry prefix.
    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.key.starts_with(prefix)
    }
}

/// In-memory event log tracking all state mutations with monotonic
/// sequence numbers. The StateStore emits into it on every put/delete;
/// controllers subscribe to turn mutations into reconcile triggers.
#[derive(Clone)]
pub struct EventLog {
    inner: Arc<RwLock<EventLogInner>>,
    sender: broadcast::Sender<WatchEvent>,
}

struct EventLogInner {
    seq: u64,
    /// Ring buffer of recent events (capped)
    events: VecDeque<WatchEvent>,
    max_events: usize,
}

impl EventLog {
    /// Create a new event log with the given capacity for recent events.
    pub fn new(max_events: usize) -> Self {
        let (sender, _) = broadcast::channel(max_events);
        Self {
            inner: Arc::new(RwLock::new(EventLogInner {
                seq: 0,
                events: VecDeque::with_capacity(max_events),
                max_events,
            })),
            sender,
        }
    }

    /// Record a new event. Called by StateStore on put/delete.
    pub async fn emit(&self, event_type: EventType, key: String) {
        let mut inner = self.inner.write().await;
        inner.seq += 1;
        let event = WatchEvent {
            seq: inner.seq,
            event_type,
            key,
        };
        if inner.events.len() >= inner.max_events {
            inner.events.pop_front();
        }
        inner.events.push_back(event.clone());
        // Broadcast to subscribers (ignore errors if no receivers)
        let _ = self.sender.send(event);
    }

    /// Get the current sequence number.
    pub async fn current_seq(&self) -> u64 {
        self.inner.read().await.seq
    }

    /// Get all buffered events newer than the given sequence number.
    pub async fn events_since(&self, from_seq: u64) -> Vec<WatchEvent> {
        let inner = self.inner.read().await;
        inner
            .events
            .iter()
            .filter(|e| e.seq > from_seq)
            .cloned()
            .collect()
    }

    /// Subscribe to receive new events as they are emitted.
    pub fn subscribe(&self) -> broadcast::Receiver<WatchEvent> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn emit_assigns_monotonic_sequence() {
        let log = EventLog::new(16);
        log.emit(EventType::Put, "/registry/sleepschedules/dev/a".into())
            .await;
        log.emit(EventType::Delete, "/registry/sleepschedules/dev/a".into())
            .await;
        assert_eq!(log.current_seq().await, 2);
        let events = log.events_since(0).await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].seq, 1);
        assert_eq!(events[1].event_type, EventType::Delete);
    }

    #[tokio::test]
    async fn subscribers_receive_events() {
        let log = EventLog::new(16);
        let mut rx = log.subscribe();
        log.emit(EventType::Put, "/registry/deployments/dev/x".into())
            .await;
        let ev = rx.recv().await.unwrap();
        assert!(ev.has_prefix("/registry/deployments/"));
        assert!(!ev.has_prefix("/registry/sleepschedules/"));
    }

    #[tokio::test]
    async fn ring_buffer_drops_oldest() {
        let log = EventLog::new(2);
        for i in 0..3 {
            log.emit(EventType::Put, format!("/k/{}", i)).await;
        }
        let events = log.events_since(0).await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].seq, 2);
    }
}
