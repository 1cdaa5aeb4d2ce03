//! Domain events emitted by session lifecycle operations.
//!
//! Events are published on an [`EventBus`] and consumed by anything that
//! wants to react to authentication changes without holding a reference to
//! the session manager itself.

pub mod session;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

pub use session::SessionEvent;

/// Default capacity of the event bus ring buffer.
const DEFAULT_BUS_CAPACITY: usize = 64;

/// Wrapper for all domain events with metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    /// Unique event ID.
    pub id: Uuid,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// The subject whose session the event concerns (if known).
    pub actor_id: Option<String>,
    /// The event payload.
    pub payload: EventPayload,
}

/// Union of all domain event types.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "domain", content = "event")]
pub enum EventPayload {
    /// A session-related event.
    Session(SessionEvent),
}

impl DomainEvent {
    /// Create a new domain event.
    pub fn new(actor_id: Option<String>, payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            actor_id,
            payload,
        }
    }

    /// Create a session domain event.
    pub fn session(actor_id: Option<String>, event: SessionEvent) -> Self {
        Self::new(actor_id, EventPayload::Session(event))
    }
}

/// In-process broadcast bus for domain events.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<DomainEvent>,
}

impl EventBus {
    /// Create a bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event. Events published with no subscribers are dropped.
    pub fn publish(&self, event: DomainEvent) {
        let _ = self.sender.send(event);
    }

    /// Subscribe to all subsequently published events.
    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_BUS_CAPACITY)
    }
}
