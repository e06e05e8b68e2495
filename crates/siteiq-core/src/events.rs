//! Orchestrator notifications
//!
//! Subscribers receive events over bounded channels. Publishing never waits:
//! a subscriber whose buffer is full misses the event and the bus counts the
//! drop; a subscriber whose receiver is gone is removed.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

use crate::query::Priority;
use crate::response::{AlertResult, InsightResult, LayerFailure, QueryStatus};

/// Something that happened while processing a query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OrchestratorEvent {
    QueryAdmitted {
        query_id: Uuid,
        priority: Priority,
    },
    LayerFailed {
        query_id: Uuid,
        failure: LayerFailure,
    },
    HazardDetected {
        query_id: Uuid,
        project_id: String,
        alert: AlertResult,
    },
    /// A synthesized insight
    InsightGenerated {
        query_id: Uuid,
        insight: InsightResult,
    },
    QueryFinished {
        query_id: Uuid,
        status: QueryStatus,
        #[serde(with = "crate::types::duration_millis")]
        processing_time: Duration,
    },
}

impl OrchestratorEvent {
    pub fn query_id(&self) -> Uuid {
        match self {
            OrchestratorEvent::QueryAdmitted { query_id, .. }
            | OrchestratorEvent::LayerFailed { query_id, .. }
            | OrchestratorEvent::HazardDetected { query_id, .. }
            | OrchestratorEvent::InsightGenerated { query_id, .. }
            | OrchestratorEvent::QueryFinished { query_id, .. } => *query_id,
        }
    }
}

/// Receiving end handed to a subscriber
#[derive(Debug)]
pub struct EventSubscription {
    id: Uuid,
    receiver: mpsc::Receiver<OrchestratorEvent>,
}

impl EventSubscription {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Wait for the next event; `None` once the bus is gone
    pub async fn recv(&mut self) -> Option<OrchestratorEvent> {
        self.receiver.recv().await
    }

    /// Next buffered event, if any
    pub fn try_recv(&mut self) -> Option<OrchestratorEvent> {
        self.receiver.try_recv().ok()
    }

    /// Everything currently buffered
    pub fn drain(&mut self) -> Vec<OrchestratorEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }
}

/// Fan-out of [`OrchestratorEvent`]s to bounded subscriber channels
#[derive(Debug)]
pub struct EventBus {
    subscribers: DashMap<Uuid, mpsc::Sender<OrchestratorEvent>>,
    capacity: usize,
    dropped: AtomicU64,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            subscribers: DashMap::new(),
            capacity: capacity.max(1),
            dropped: AtomicU64::new(0),
        }
    }

    pub fn subscribe(&self) -> EventSubscription {
        let (sender, receiver) = mpsc::channel(self.capacity);
        let id = Uuid::new_v4();
        self.subscribers.insert(id, sender);
        tracing::debug!(subscriber = %id, "event subscriber added");
        EventSubscription { id, receiver }
    }

    pub fn publish(&self, event: OrchestratorEvent) {
        let mut closed = Vec::new();

        for entry in self.subscribers.iter() {
            match entry.value().try_send(event.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(subscriber = %entry.key(), "event dropped: subscriber buffer full");
                }
                Err(TrySendError::Closed(_)) => closed.push(*entry.key()),
            }
        }

        for id in closed {
            self.subscribers.remove(&id);
            tracing::debug!(subscriber = %id, "event subscriber removed");
        }
    }

    /// Events lost to full subscriber buffers
    pub fn dropped_events(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
